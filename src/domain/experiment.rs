// ============================================================
// Layer 3 — Experiment Identity and File Naming
// ============================================================
// Every artifact a run writes is keyed by the experiment id:
//
//   model_experiment_03_epoch_00.mpk.gz   ← weights after epoch 0
//   model_experiment_03_epoch_01.mpk.gz
//   model_experiment_03.mpk.gz            ← final weights
//   output_experiment_03_02.npy           ← test logits, split 2
//   labels_experiment_03_02.npy           ← test labels, split 2
//
// Datasets without cross-validation splits key their result
// files by the final test accuracy instead:
//
//   output_experiment_03_87.2500.npy
//
// The recorder appends the `.mpk.gz` extension itself, so the
// checkpoint helpers here return file stems.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which benchmark the data directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    /// NTU RGB+D — single train/test protocol
    Ntu,
    /// SYSU 3D HOI — evaluated over numbered cross-validation splits
    Sysu,
}

impl DatasetKind {
    /// True when results are reported per cross-validation split
    pub fn has_splits(self) -> bool {
        matches!(self, DatasetKind::Sysu)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Ntu  => write!(f, "NTU"),
            DatasetKind::Sysu => write!(f, "SYSU"),
        }
    }
}

/// How the test-result files of a run are keyed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultNaming {
    /// `_{split:02}` — dataset exposes cross-validation splits
    BySplit(u32),
    /// `_{accuracy:.4}` — keyed by the final test accuracy
    ByAccuracy,
}

impl ResultNaming {
    /// Pick the naming scheme for a dataset.
    /// Split-based datasets must be given a split number.
    pub fn for_dataset(kind: DatasetKind, split: Option<u32>) -> Result<Self> {
        match (kind.has_splits(), split) {
            (true, Some(s)) => Ok(ResultNaming::BySplit(s)),
            (true, None)    => bail!("dataset {kind} requires a split number (--split)"),
            (false, _)      => Ok(ResultNaming::ByAccuracy),
        }
    }

    /// The key appended to result file names
    pub fn key(self, accuracy: f64) -> String {
        match self {
            ResultNaming::BySplit(s) => format!("{s:02}"),
            ResultNaming::ByAccuracy => format!("{accuracy:.4}"),
        }
    }
}

/// File stem of the checkpoint written after `epoch`.
pub fn epoch_checkpoint_stem(experiment: u32, epoch: usize) -> String {
    format!("model_experiment_{experiment:02}_epoch_{epoch:02}")
}

/// File stem of the checkpoint written at the end of the run.
pub fn final_checkpoint_stem(experiment: u32) -> String {
    format!("model_experiment_{experiment:02}")
}

pub fn output_file_name(experiment: u32, key: &str) -> String {
    format!("output_experiment_{experiment:02}_{key}.npy")
}

pub fn labels_file_name(experiment: u32, key: &str) -> String {
    format!("labels_experiment_{experiment:02}_{key}.npy")
}
