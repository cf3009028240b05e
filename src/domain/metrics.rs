// ============================================================
// Layer 3 — Running Metrics
// ============================================================
// Accumulates top-1 correct/total counts and a list of scalar
// losses over one epoch. A fresh accumulator is created at
// the start of every training or evaluation epoch and turned
// into an `EpochSummary` when the epoch ends.
//
// With no recorded predictions the accuracy is 0.0, and with
// no recorded losses the mean loss is 0.0.

/// Per-epoch accumulator of predictions and losses.
#[derive(Debug, Default, Clone)]
pub struct RunningMetrics {
    loss_sum:     f64,
    loss_samples: usize,
    correct:      usize,
    total:        usize,
}

impl RunningMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch worth of top-1 results
    pub fn record_predictions(&mut self, correct: usize, total: usize) {
        debug_assert!(correct <= total);
        self.correct += correct;
        self.total   += total;
    }

    /// Append one scalar batch loss
    pub fn record_loss(&mut self, loss: f64) {
        self.loss_sum     += loss;
        self.loss_samples += 1;
    }

    /// Percentage of correct predictions, 100 × correct / total
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.correct as f64 / self.total as f64
    }

    /// Mean of every recorded loss
    pub fn mean_loss(&self) -> f64 {
        if self.loss_samples == 0 {
            return 0.0;
        }
        self.loss_sum / self.loss_samples as f64
    }

    /// Close the epoch
    pub fn summary(&self) -> EpochSummary {
        EpochSummary {
            accuracy:       self.accuracy(),
            mean_loss:      self.mean_loss(),
            metric_samples: self.loss_samples,
            correct:        self.correct,
            total:          self.total,
        }
    }
}

/// What an epoch runner reports once its pass is complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    /// Top-1 accuracy in percent
    pub accuracy:       f64,
    /// Mean of the sampled losses (0.0 when none were sampled)
    pub mean_loss:      f64,
    /// How many batches contributed a loss sample
    pub metric_samples: usize,
    pub correct:        usize,
    pub total:          usize,
}
