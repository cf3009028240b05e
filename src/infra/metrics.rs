// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch so learning curves
// can be plotted after the run.
//
// Output file: <checkpoint_dir>/metrics_experiment_NN.csv
//
//   epoch,learning_rate,train_loss,train_accuracy,validation_accuracy
//   0,0.00100000,2.714500,18.750000,
//   1,0.00100000,2.011200,31.250000,
//
// The validation column is empty when no validation set is used.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    /// 0-based epoch index
    pub epoch:               usize,
    pub learning_rate:       f64,
    /// Mean of the sampled training losses
    pub train_loss:          f64,
    /// Sampled training accuracy, in percent
    pub train_accuracy:      f64,
    pub validation_accuracy: Option<f64>,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>, experiment: u32) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let csv_path = dir.join(format!("metrics_experiment_{experiment:02}.csv"));

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,learning_rate,train_loss,train_accuracy,validation_accuracy")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, r: &EpochRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        let validation = r
            .validation_accuracy
            .map(|v| format!("{v:.6}"))
            .unwrap_or_default();
        writeln!(
            f,
            "{},{:.8},{:.6},{:.6},{}",
            r.epoch, r.learning_rate, r.train_loss, r.train_accuracy, validation,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
