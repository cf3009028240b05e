// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
//   model.rs     — `ActionNetwork` trait and the baseline
//                  one/two-stream classifier
//   context.rs   — device placement + execution mode
//   schedule.rs  — step-decay learning rate
//   trainer.rs   — one training epoch
//   evaluator.rs — one validation / testing pass
//   progress.rs  — live epoch progress bars

/// Network trait and baseline classifier
pub mod model;

/// Compute context (device, training vs. inference)
pub mod context;

/// Step-decay learning-rate schedule
pub mod schedule;

/// Training epoch runner
pub mod trainer;

/// Evaluation epoch runner
pub mod evaluator;

/// indicatif progress bars
pub mod progress;
