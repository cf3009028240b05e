// ============================================================
// Layer 3 — Input Modality
// ============================================================
// A dataset yields either one input tensor per sample
// (skeleton joints, RGB frames, optical flow) or two
// co-indexed tensors (e.g. RGB + flow for a two-stream net).
//
// The modality is fixed when a provider is constructed and
// the network must declare the same one; it is never guessed
// from the contents of a batch.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    /// One input tensor per sample
    Single,
    /// Two input tensors per sample (stream A, stream B)
    Dual,
}

impl Modality {
    /// Number of input tensors a batch of this modality carries
    pub fn stream_count(self) -> usize {
        match self {
            Modality::Single => 1,
            Modality::Dual   => 2,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Single => write!(f, "single-input"),
            Modality::Dual   => write!(f, "dual-input"),
        }
    }
}
