// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Runs one experiment end to end:
//
//   Step 1: Install the Ctrl-C handler          (Layer 6 - infra)
//   Step 2: Place the network on the device     (Layer 5 - ml)
//   Step 3: Build Adam, step decay, the loss    (Layer 5 - ml)
//   Step 4: For every epoch
//             advance the scheduler
//             train one epoch                   (Layer 5 - ml)
//             save the epoch checkpoint         (Layer 6 - infra)
//             validate (when requested)         (Layer 5 - ml)
//             append the metrics row            (Layer 6 - infra)
//   Step 5: Save the final checkpoint           (Layer 6 - infra)
//   Step 6: One Testing pass, persist results   (Layer 5 + 6)
//
// Nothing is retried: the first error ends the run.

use anyhow::{ensure, Context, Result};
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::provider::{ActionDatasetProvider, DatasetProvider, ProviderOptions};
use crate::domain::experiment::{DatasetKind, ResultNaming};
use crate::infra::{
    checkpoint::CheckpointStore,
    interrupt::install_exit_on_interrupt,
    metrics::{EpochRecord, MetricsLogger},
    results::ResultStore,
};
use crate::ml::{
    context::ComputeContext,
    evaluator::{run_eval_epoch, EvalMode, EvalOutcome},
    model::{ActionClassifier, ActionClassifierConfig, ActionNetwork},
    progress::EpochProgress,
    schedule::StepDecay,
    trainer::run_training_epoch,
};

// ─── Experiment Configuration ────────────────────────────────────────────────
// Everything a run needs, passed in explicitly. Saved as JSON next
// to the checkpoints so `eval` can rebuild the same experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub dataset:             DatasetKind,
    pub data_dir:            String,
    pub experiment:          u32,
    /// Cross-validation split (sysu only)
    pub split:               Option<u32>,
    pub epochs:              usize,
    pub batch_size:          usize,
    pub learning_rate:       f64,
    /// Epochs between learning-rate decays
    pub lr_step_size:        usize,
    pub lr_gamma:            f64,
    pub hidden_size:         usize,
    pub dropout:             f64,
    pub checkpoint_dir:      String,
    pub results_dir:         String,
    pub seed:                u64,
    pub validation_fraction: Option<f64>,
    /// Checkpoint loaded into the network before training
    pub init_from:           Option<String>,
    pub freeze_encoders:     bool,
    #[serde(skip)]
    pub show_progress:       bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset:             DatasetKind::Ntu,
            data_dir:            "data/ntu".to_string(),
            experiment:          1,
            split:               None,
            epochs:              50,
            batch_size:          32,
            learning_rate:       0.001,
            lr_step_size:        5,
            lr_gamma:            0.5,
            hidden_size:         256,
            dropout:             0.5,
            checkpoint_dir:      "checkpoints".to_string(),
            results_dir:         "results".to_string(),
            seed:                42,
            validation_fraction: None,
            init_from:           None,
            freeze_encoders:     false,
            show_progress:       true,
        }
    }
}

impl ExperimentConfig {
    /// Directory holding the `.npy` arrays of this experiment.
    /// Datasets with cross-validation splits keep one per split.
    pub fn dataset_root(&self) -> PathBuf {
        match self.split {
            Some(split) if self.dataset.has_splits() => {
                Path::new(&self.data_dir).join(format!("split_{split:02}"))
            }
            _ => PathBuf::from(&self.data_dir),
        }
    }

    pub fn result_naming(&self) -> Result<ResultNaming> {
        ResultNaming::for_dataset(self.dataset, self.split)
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            batch_size:          self.batch_size,
            seed:                self.seed,
            validation_fraction: self.validation_fraction,
        }
    }

    /// Baseline network sized for `provider`'s data
    pub fn model_config<P: DatasetProvider>(&self, provider: &P) -> ActionClassifierConfig {
        ActionClassifierConfig::new(provider.input_features(), provider.num_classes(), provider.modality())
            .with_hidden_size(self.hidden_size)
            .with_dropout(self.dropout)
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    /// One per epoch, in epoch order
    pub epoch_checkpoints: Vec<PathBuf>,
    pub final_checkpoint:  PathBuf,
    pub history:           Vec<EpochRecord>,
    pub test:              EvalOutcome,
}

impl RunReport {
    pub fn test_accuracy(&self) -> f64 {
        self.test.accuracy()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Load the `.npy` dataset, build the baseline network and run.
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<RunReport> {
        let cfg = &self.config;
        let provider = ActionDatasetProvider::from_dir(&cfg.dataset_root(), cfg.provider_options())?;

        let model_cfg = cfg.model_config(&provider);
        let mut network: ActionClassifier<B> = model_cfg.init(&device);
        if let Some(path) = &cfg.init_from {
            tracing::info!("Warm start from '{path}'");
            network = CheckpointStore::load(network, Path::new(path), &device)?;
        }
        if cfg.freeze_encoders {
            tracing::info!("Stream encoders frozen");
            network = network.freeze_encoders();
        }

        CheckpointStore::new(&cfg.checkpoint_dir, cfg.experiment)?.save_model_config(&model_cfg)?;
        self.run_with(network, &provider, device)
    }

    /// The epoch loop over any network and provider.
    pub fn run_with<B, M, P>(&self, network: M, provider: &P, device: B::Device) -> Result<RunReport>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + ActionNetwork<B>,
        M::InnerModule: ActionNetwork<B::InnerBackend>,
        P: DatasetProvider,
    {
        let cfg = &self.config;
        install_exit_on_interrupt()?;

        ensure!(
            network.modality() == provider.modality(),
            "network expects {} input but the dataset is {}",
            network.modality(),
            provider.modality()
        );
        let naming = cfg.result_naming()?;

        // ── Device placement ──────────────────────────────────────────────────
        let ctx       = ComputeContext::<B>::training(device);
        let infer_ctx = ctx.to_inference();
        let mut model = ctx.place_model(network);

        let train_loader = provider.train_loader::<B>(ctx.device());
        let valid_loader = provider.validation_loader::<B::InnerBackend>(infer_ctx.device());
        let test_loader  = provider.test_loader::<B::InnerBackend>(infer_ctx.device());

        // ── Optimizer, schedule, loss ─────────────────────────────────────────
        let mut optim    = AdamConfig::new().init::<B, M>();
        let mut schedule = StepDecay::new(cfg.learning_rate, cfg.lr_step_size, cfg.lr_gamma)?;
        let loss_fn      = CrossEntropyLossConfig::new().init(ctx.device());

        // ── Output stores ─────────────────────────────────────────────────────
        let checkpoints = CheckpointStore::new(&cfg.checkpoint_dir, cfg.experiment)?;
        checkpoints.save_config(cfg)?;
        let metrics_log = MetricsLogger::new(&cfg.checkpoint_dir, cfg.experiment)?;
        let results     = ResultStore::new(&cfg.results_dir, cfg.experiment, naming)?;

        tracing::info!(
            "Experiment {:02}: {} epochs, {} training batches per epoch, batch size {}",
            cfg.experiment, cfg.epochs, train_loader.batches(), cfg.batch_size,
        );

        let mut epoch_checkpoints = Vec::with_capacity(cfg.epochs);
        let mut history           = Vec::with_capacity(cfg.epochs);

        for epoch in 0..cfg.epochs {
            let learning_rate = schedule.next_learning_rate();

            let progress = EpochProgress::training(epoch, train_loader.batches(), cfg.show_progress);
            let trained  = run_training_epoch(
                &ctx,
                model,
                &mut optim,
                &loss_fn,
                learning_rate,
                epoch,
                train_loader.iter(),
                &progress,
            )?;
            model = trained.model;

            epoch_checkpoints.push(checkpoints.save_epoch(&model, epoch)?);

            let validation_accuracy = match &valid_loader {
                Some(loader) => {
                    let label    = format!("Validation {epoch:02}");
                    let progress = EpochProgress::evaluation(&label, loader.batches(), cfg.show_progress);
                    let outcome  = run_eval_epoch(
                        &infer_ctx,
                        &ctx.enter_inference(&model),
                        loader.iter(),
                        EvalMode::Validation,
                        &progress,
                    )?;
                    Some(outcome.accuracy())
                }
                None => None,
            };

            let record = EpochRecord {
                epoch,
                learning_rate,
                train_loss:     trained.summary.mean_loss,
                train_accuracy: trained.summary.accuracy,
                validation_accuracy,
            };
            metrics_log.log(&record)?;
            history.push(record);
        }

        let final_checkpoint = checkpoints.save_final(&model)?;

        // ── Testing pass ──────────────────────────────────────────────────────
        let progress = EpochProgress::evaluation("Testing", test_loader.batches(), cfg.show_progress);
        let test = run_eval_epoch(
            &infer_ctx,
            &ctx.enter_inference(&model),
            test_loader.iter(),
            EvalMode::Testing(&results),
            &progress,
        )
        .context("Testing pass failed")?;

        Ok(RunReport { epoch_checkpoints, final_checkpoint, history, test })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::modality::Modality;
    use crate::ml::schedule::StepDecay;
    use crate::testing::{sample_dataset, write_npy_split, TestAutodiff, TestBackend};

    fn config(dir: &Path, epochs: usize, batch_size: usize) -> ExperimentConfig {
        ExperimentConfig {
            data_dir:       dir.join("data").display().to_string(),
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            results_dir:    dir.join("results").display().to_string(),
            experiment:     3,
            epochs,
            batch_size,
            hidden_size:    16,
            show_progress:  false,
            ..ExperimentConfig::default()
        }
    }

    fn provider(train: usize, test: usize, batch_size: usize, modality: Modality) -> ActionDatasetProvider {
        let options = ProviderOptions { batch_size, seed: 1, validation_fraction: None };
        ActionDatasetProvider::new(
            sample_dataset(train, 4, 6, 5, modality),
            sample_dataset(test, 4, 6, 5, modality),
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_three_epochs_write_every_artifact() {
        let dir      = tempfile::tempdir().unwrap();
        let cfg      = config(dir.path(), 3, 4);
        let provider = provider(100, 12, 4, Modality::Single);
        let device   = Default::default();
        let network: ActionClassifier<TestAutodiff> = cfg.model_config(&provider).init(&device);

        let report = TrainUseCase::new(cfg.clone()).run_with(network, &provider, device).unwrap();

        let ckpt = Path::new(&cfg.checkpoint_dir);
        assert_eq!(report.epoch_checkpoints.len(), 3);
        for epoch in 0..3 {
            let path = ckpt.join(format!("model_experiment_03_epoch_{epoch:02}.mpk.gz"));
            assert_eq!(report.epoch_checkpoints[epoch], path);
            assert!(path.exists());
        }
        assert!(ckpt.join("model_experiment_03.mpk.gz").exists());
        assert!(ckpt.join("experiment_03_config.json").exists());
        assert!(ckpt.join("metrics_experiment_03.csv").exists());

        // 25 batches per epoch → 2 metric samples of 4 each
        for record in &report.history {
            assert!(record.train_loss > 0.0);
            assert!(record.validation_accuracy.is_none());
        }

        let files = report.test.results.as_ref().unwrap();
        assert!(files.outputs.exists());
        assert!(files.labels.exists());
        let key = format!("{:.4}", report.test_accuracy());
        assert!(files.outputs.ends_with(format!("output_experiment_03_{key}.npy")));
    }

    #[test]
    fn test_learning_rate_is_advanced_before_each_epoch() {
        let dir      = tempfile::tempdir().unwrap();
        let mut cfg  = config(dir.path(), 3, 4);
        cfg.lr_step_size = 1;
        let provider = provider(8, 4, 4, Modality::Single);
        let device   = Default::default();
        let network: ActionClassifier<TestAutodiff> = cfg.model_config(&provider).init(&device);

        let report = TrainUseCase::new(cfg).run_with(network, &provider, device).unwrap();
        let rates: Vec<f64> = report.history.iter().map(|r| r.learning_rate).collect();
        assert_eq!(rates, vec![0.0005, 0.00025, 0.000125]);

        // Fewer than 10 batches: nothing was sampled
        assert_eq!(report.history[0].train_accuracy, 0.0);
        assert_eq!(report.history[0].train_loss, 0.0);
    }

    #[test]
    fn test_default_schedule_matches_step_decay() {
        let cfg   = ExperimentConfig::default();
        let decay = StepDecay::new(cfg.learning_rate, cfg.lr_step_size, cfg.lr_gamma).unwrap();
        assert_eq!(decay.rate_for_epoch(0), 0.001);
        assert_eq!(decay.rate_for_epoch(4), 0.0005);
    }

    #[test]
    fn test_validation_runs_every_epoch_when_requested() {
        let dir      = tempfile::tempdir().unwrap();
        let cfg      = config(dir.path(), 2, 4);
        let options  = ProviderOptions { batch_size: 4, seed: 1, validation_fraction: Some(0.25) };
        let provider = ActionDatasetProvider::new(
            sample_dataset(40, 4, 6, 5, Modality::Dual),
            sample_dataset(8, 4, 6, 5, Modality::Dual),
            options,
        )
        .unwrap();
        let device  = Default::default();
        let network: ActionClassifier<TestAutodiff> = cfg.model_config(&provider).init(&device);

        let report = TrainUseCase::new(cfg).run_with(network, &provider, device).unwrap();
        assert!(report.history.iter().all(|r| r.validation_accuracy.is_some()));
    }

    #[test]
    fn test_modality_mismatch_is_rejected_before_training() {
        let dir      = tempfile::tempdir().unwrap();
        let cfg      = config(dir.path(), 1, 4);
        let provider = provider(8, 4, 4, Modality::Dual);
        let device   = Default::default();
        let network: ActionClassifier<TestAutodiff> =
            ActionClassifierConfig::new(6, 5, Modality::Single).init(&device);

        let err = TrainUseCase::new(cfg.clone()).run_with(network, &provider, device).unwrap_err();
        assert!(err.to_string().contains("dual"));
        assert!(!Path::new(&cfg.checkpoint_dir).join("experiment_03_config.json").exists());
    }

    #[test]
    fn test_sysu_without_split_is_rejected() {
        let dir      = tempfile::tempdir().unwrap();
        let mut cfg  = config(dir.path(), 1, 4);
        cfg.dataset  = DatasetKind::Sysu;
        let provider = provider(8, 4, 4, Modality::Single);
        let device   = Default::default();
        let network: ActionClassifier<TestAutodiff> = cfg.model_config(&provider).init(&device);
        assert!(TrainUseCase::new(cfg).run_with(network, &provider, device).is_err());
    }

    #[test]
    fn test_sysu_root_and_result_key_use_split() {
        let cfg = ExperimentConfig {
            dataset:  DatasetKind::Sysu,
            data_dir: "data/sysu".to_string(),
            split:    Some(7),
            ..ExperimentConfig::default()
        };
        assert_eq!(cfg.dataset_root(), Path::new("data/sysu/split_07"));
        assert_eq!(cfg.result_naming().unwrap(), ResultNaming::BySplit(7));

        let ntu = ExperimentConfig { split: Some(7), ..ExperimentConfig::default() };
        assert_eq!(ntu.dataset_root(), Path::new("data/ntu"));
    }

    #[test]
    fn test_execute_from_npy_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 2, 4);
        cfg.freeze_encoders = true;
        let data = Path::new(&cfg.data_dir);
        std::fs::create_dir_all(data).unwrap();
        write_npy_split(data, "train", 24, 3, 5, 4, true);
        write_npy_split(data, "test", 8, 3, 5, 4, true);

        let report = TrainUseCase::new(cfg.clone())
            .execute::<TestAutodiff>(Default::default())
            .unwrap();
        assert_eq!(report.test.summary.total, 8);

        let saved: ActionClassifierConfig =
            CheckpointStore::new(&cfg.checkpoint_dir, 3).unwrap().load_model_config().unwrap();
        assert_eq!(saved.modality, Modality::Dual);
        assert_eq!(saved.input_features, 5);
        assert_eq!(saved.num_classes, 4);

        // Warm start from the finished run
        let mut warm = cfg;
        warm.experiment = 4;
        warm.init_from  = Some(report.final_checkpoint.display().to_string());
        let device = Default::default();
        let restored = CheckpointStore::load(
            saved.init::<TestBackend>(&device),
            &report.final_checkpoint,
            &device,
        );
        assert!(restored.is_ok());
        assert!(TrainUseCase::new(warm).execute::<TestAutodiff>(Default::default()).is_ok());
    }
}
