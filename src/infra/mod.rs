// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem or the process:
//
//   checkpoint.rs — model weights (Burn recorder) plus the
//                   experiment / architecture configs as JSON
//   results.rs    — raw test logits and labels per experiment
//   npy.rs        — NumPy `.npy` reader/writer used by the
//                   result store and the dataset provider
//   metrics.rs    — per-epoch CSV history
//   interrupt.rs  — Ctrl-C terminates the run

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Test-pass output/label persistence
pub mod results;

/// NumPy array files
pub mod npy;

/// Training metrics CSV logger
pub mod metrics;

/// Process-wide Ctrl-C handler
pub mod interrupt;
