use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{prefix:>14} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";

/// Live per-epoch progress line. Observability only; runners
/// report into it but never read from it.
pub struct EpochProgress {
    bar: ProgressBar,
}

impl EpochProgress {
    fn visible(prefix: String, batches: usize) -> Self {
        let bar = ProgressBar::new(batches as u64);
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_prefix(prefix);
        Self { bar }
    }

    pub fn training(epoch: usize, batches: usize, show: bool) -> Self {
        if show { Self::visible(format!("Epoch {epoch:02}"), batches) } else { Self::hidden() }
    }

    pub fn evaluation(label: &str, batches: usize, show: bool) -> Self {
        if show { Self::visible(label.to_string(), batches) } else { Self::hidden() }
    }

    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    pub fn report_training(&self, mean_loss: f64, accuracy: f64) {
        self.bar.set_message(format!("loss {mean_loss:.5} acc {accuracy:.4}"));
    }

    pub fn report_accuracy(&self, accuracy: f64) {
        self.bar.set_message(format!("acc {accuracy:.4}"));
    }

    pub fn advance(&self) {
        self.bar.inc(1);
    }

    /// Leave the finished bar on screen (training epochs)
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Remove the bar once done (evaluation passes)
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
