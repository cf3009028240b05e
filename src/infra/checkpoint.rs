// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Saves and restores network weights with Burn's named
// MessagePack + gzip recorder at full f32 precision, so a
// reloaded network reproduces the saved parameters exactly.
//
// What gets written for experiment NN:
//   <dir>/
//     model_experiment_NN_epoch_00.mpk.gz   ← after epoch 0
//     model_experiment_NN_epoch_01.mpk.gz   ← after epoch 1
//     ...
//     model_experiment_NN.mpk.gz            ← end of the run
//     experiment_NN_config.json             ← ExperimentConfig
//     model_experiment_NN.json              ← network architecture
//
// Checkpoints are written unconditionally after every epoch;
// a file is never rewritten once the run has moved on.

use anyhow::{anyhow, Context, Result};
use burn::{
    config::Config,
    module::Module,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::Backend,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::ExperimentConfig;
use crate::domain::experiment::{epoch_checkpoint_stem, final_checkpoint_stem};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const CHECKPOINT_EXTENSION: &str = "mpk.gz";

/// Writes and reads the checkpoints of one experiment.
pub struct CheckpointStore {
    dir:        PathBuf,
    experiment: u32,
}

impl CheckpointStore {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>, experiment: u32) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir, experiment })
    }

    /// Full path of the checkpoint written after `epoch`
    pub fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.with_extension(epoch_checkpoint_stem(self.experiment, epoch))
    }

    /// Full path of the end-of-run checkpoint
    pub fn final_path(&self) -> PathBuf {
        self.with_extension(final_checkpoint_stem(self.experiment))
    }

    /// Snapshot the network after `epoch`.
    pub fn save_epoch<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<PathBuf> {
        self.save(model, epoch_checkpoint_stem(self.experiment, epoch))
    }

    /// Snapshot the network at the end of the run.
    pub fn save_final<B: Backend, M: Module<B>>(&self, model: &M) -> Result<PathBuf> {
        self.save(model, final_checkpoint_stem(self.experiment))
    }

    /// Restore weights written by `save_epoch` / `save_final` (or any
    /// compatible checkpoint file) into `model`.
    ///
    /// The architecture of `model` must match the checkpoint.
    pub fn load<B: Backend, M: Module<B>>(
        model:  M,
        path:   &Path,
        device: &B::Device,
    ) -> Result<M> {
        let stem = strip_extension(path);
        let record = CheckpointRecorder::new()
            .load(stem, device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        tracing::debug!("Restored weights from '{}'", path.display());
        Ok(model.load_record(record))
    }

    /// Persist the run configuration so `eval` can rebuild the experiment.
    pub fn save_config(&self, cfg: &ExperimentConfig) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let path = self.config_path();
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Has experiment {:02} been trained?",
                path.display(),
                self.experiment
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Persist a network architecture (any Burn `Config`).
    pub fn save_model_config<C: Config>(&self, cfg: &C) -> Result<()> {
        let path = self.model_config_path();
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    pub fn load_model_config<C: Config>(&self) -> Result<C> {
        let path = self.model_config_path();
        C::load(&path)
            .map_err(|e| anyhow!("Cannot read model config '{}': {e}", path.display()))
    }

    fn save<B: Backend, M: Module<B>>(&self, model: &M, stem: String) -> Result<PathBuf> {
        // The recorder appends the extension to the stem
        let target = self.dir.join(&stem);
        CheckpointRecorder::new()
            .record(model.clone().into_record(), target)
            .with_context(|| format!("Failed to save checkpoint '{stem}'"))?;
        let path = self.with_extension(stem);
        tracing::info!("Checkpoint saved: {}", path.display());
        Ok(path)
    }

    fn with_extension(&self, stem: String) -> PathBuf {
        self.dir.join(format!("{stem}.{CHECKPOINT_EXTENSION}"))
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join(format!("experiment_{:02}_config.json", self.experiment))
    }

    fn model_config_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", final_checkpoint_stem(self.experiment)))
    }
}

/// `a/b.mpk.gz` → `a/b`; other paths are passed through.
fn strip_extension(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(&format!(".{CHECKPOINT_EXTENSION}")) {
        Some(stem) => PathBuf::from(stem),
        None       => path.to_path_buf(),
    }
}
