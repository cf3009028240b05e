// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math, no printing,
// no direct file formats. Each use case receives its whole
// configuration explicitly from Layer 1.

// Train, checkpoint every epoch, then one Testing pass
pub mod train_use_case;

// Restore a checkpoint and repeat the Testing pass
pub mod eval_use_case;
