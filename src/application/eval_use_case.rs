// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Re-runs the Testing pass of a finished experiment:
//
//   Step 1: Load experiment_NN_config.json     (Layer 6 - infra)
//   Step 2: Rebuild the network from its config (Layer 5 - ml)
//   Step 3: Restore the final / epoch weights   (Layer 6 - infra)
//   Step 4: One Testing pass, persist results   (Layer 5 + 6)
//
// No autodiff backend is involved.

use anyhow::{ensure, Result};
use burn::tensor::backend::Backend;

use crate::data::provider::{ActionDatasetProvider, DatasetProvider, ProviderOptions};
use crate::infra::{checkpoint::CheckpointStore, results::ResultStore};
use crate::ml::{
    context::ComputeContext,
    evaluator::{run_eval_epoch, EvalMode, EvalOutcome},
    model::{ActionClassifierConfig, ActionNetwork},
    progress::EpochProgress,
};

pub struct EvalUseCase {
    checkpoint_dir: String,
    experiment:     u32,
    /// Evaluate this epoch's checkpoint instead of the final one
    epoch:          Option<usize>,
    show_progress:  bool,
}

impl EvalUseCase {
    pub fn new(checkpoint_dir: String, experiment: u32, epoch: Option<usize>, show_progress: bool) -> Self {
        Self { checkpoint_dir, experiment, epoch, show_progress }
    }

    pub fn execute<B: Backend>(&self, device: B::Device) -> Result<EvalOutcome> {
        let checkpoints = CheckpointStore::new(&self.checkpoint_dir, self.experiment)?;
        let cfg         = checkpoints.load_config()?;
        let model_cfg: ActionClassifierConfig = checkpoints.load_model_config()?;

        // The validation carve-out only affects the training split
        let options  = ProviderOptions { validation_fraction: None, ..cfg.provider_options() };
        let provider = ActionDatasetProvider::from_dir(&cfg.dataset_root(), options)?;

        let path = match self.epoch {
            Some(epoch) => checkpoints.epoch_path(epoch),
            None        => checkpoints.final_path(),
        };
        tracing::info!("Evaluating '{}'", path.display());

        let ctx   = ComputeContext::<B>::inference(device);
        let model = CheckpointStore::load(model_cfg.init::<B>(ctx.device()), &path, ctx.device())?;
        let model = ctx.place_model(model);
        ensure!(
            model.modality() == provider.modality(),
            "checkpoint expects {} input but the dataset is {}",
            model.modality(),
            provider.modality()
        );

        let results  = ResultStore::new(&cfg.results_dir, cfg.experiment, cfg.result_naming()?)?;
        let loader   = provider.test_loader::<B>(ctx.device());
        let progress = EpochProgress::evaluation("Testing", loader.batches(), self.show_progress);
        run_eval_epoch(&ctx, &model, loader.iter(), EvalMode::Testing(&results), &progress)
    }
}
