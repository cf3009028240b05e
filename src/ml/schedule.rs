// ============================================================
// Layer 5 — Step-Decay Learning Rate
// ============================================================
// lr = base × gamma^(steps / step_size)   (integer division)
//
// The orchestrator advances the schedule once at the start of
// every epoch, before training, so epoch e runs with
// steps = e + 1. With base 0.001, step 5, gamma 0.5:
//
//   epochs 0..=3  → 0.001
//   epochs 4..=8  → 0.0005
//   epochs 9..=13 → 0.00025

use anyhow::{ensure, Result};

#[derive(Debug, Clone)]
pub struct StepDecay {
    base:      f64,
    step_size: usize,
    gamma:     f64,
    steps:     usize,
}

impl StepDecay {
    pub fn new(base: f64, step_size: usize, gamma: f64) -> Result<Self> {
        ensure!(base > 0.0,    "learning rate must be positive, got {base}");
        ensure!(step_size > 0, "decay step size must be at least 1");
        ensure!(gamma > 0.0,   "decay factor must be positive, got {gamma}");
        Ok(Self { base, step_size, gamma, steps: 0 })
    }

    /// Rate after `steps` advances
    pub fn learning_rate_at(&self, steps: usize) -> f64 {
        self.base * self.gamma.powi((steps / self.step_size) as i32)
    }

    /// Advance one epoch and return the rate to train it with.
    pub fn next_learning_rate(&mut self) -> f64 {
        self.steps += 1;
        self.learning_rate_at(self.steps)
    }

    /// Rate used for epoch `epoch` (0-based)
    pub fn rate_for_epoch(&self, epoch: usize) -> f64 {
        self.learning_rate_at(epoch + 1)
    }
}
