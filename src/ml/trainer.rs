// ============================================================
// Layer 5 — Training Epoch
// ============================================================
// One full pass over the training batches:
//
//   place batch → forward → cross-entropy → backward → Adam step
//
// Metrics are sampled, not computed on every batch: on batches
// 10, 20, 30, ... (1-indexed) the top-1 correct/total counts
// are accumulated and the batch loss is appended to the loss
// list. The returned accuracy is the cumulative accuracy of
// those sampled batches only, 0.0 if the epoch had fewer than
// ten batches.
//
// Burn builds a fresh gradient set on every `backward()`, so
// there is nothing to zero between steps.

use anyhow::{ensure, Context, Result};
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLoss,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::Batch;
use crate::domain::metrics::{EpochSummary, RunningMetrics};
use crate::ml::{
    context::{ComputeContext, ExecutionMode},
    model::ActionNetwork,
    progress::EpochProgress,
};

/// Every n-th training batch contributes to the epoch metrics
pub const METRIC_SAMPLE_INTERVAL: usize = 10;

/// The updated network plus the epoch's sampled metrics.
pub struct TrainingEpoch<M> {
    pub model:   M,
    pub summary: EpochSummary,
}

/// Run one training epoch and return the updated network.
///
/// Any batch that fails to forward aborts the epoch; the
/// partially updated network is dropped with it.
#[allow(clippy::too_many_arguments)]
pub fn run_training_epoch<B, M, O, I>(
    ctx:           &ComputeContext<B>,
    model:         M,
    optim:         &mut O,
    loss_fn:       &CrossEntropyLoss<B>,
    learning_rate: f64,
    epoch:         usize,
    batches:       I,
    progress:      &EpochProgress,
) -> Result<TrainingEpoch<M>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ActionNetwork<B>,
    O: Optimizer<M, B>,
    I: IntoIterator<Item = Batch<B>>,
{
    ensure!(
        ctx.mode() == ExecutionMode::Training,
        "training epoch needs a training context"
    );

    let mut model   = model;
    let mut metrics = RunningMetrics::new();

    for (index, batch) in batches.into_iter().enumerate() {
        let (input, labels) = ctx.place_batch(batch).into_parts();

        let output = model
            .forward(input)
            .with_context(|| format!("epoch {epoch}, training batch {}", index + 1))?;
        let loss = loss_fn.forward(output.clone(), labels.clone());

        if (index + 1) % METRIC_SAMPLE_INTERVAL == 0 {
            let batch_size = labels.dims()[0];
            metrics.record_predictions(count_correct(output, labels), batch_size);
            metrics.record_loss(loss.clone().into_scalar().elem::<f64>());
            progress.report_training(metrics.mean_loss(), metrics.accuracy());
        }

        // Backward pass + Adam update
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(learning_rate, model, grads);
        progress.advance();
    }

    progress.finish();
    let summary = metrics.summary();
    tracing::info!(
        "Epoch {:02} | lr={:.6} | sampled_loss={:.5} | sampled_acc={:.4}% ({} samples)",
        epoch, learning_rate, summary.mean_loss, summary.accuracy, summary.metric_samples,
    );
    Ok(TrainingEpoch { model, summary })
}

/// Number of rows whose argmax matches the label.
pub fn count_correct<B: Backend>(output: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = output.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{nn::loss::CrossEntropyLossConfig, optim::AdamConfig};
    use crate::domain::modality::Modality;
    use crate::ml::model::{ActionClassifier, ActionClassifierConfig};
    use crate::testing::{parameters, random_batches, TestAutodiff, TestBackend};

    fn setup(modality: Modality) -> (ComputeContext<TestAutodiff>, ActionClassifier<TestAutodiff>) {
        let ctx   = ComputeContext::<TestAutodiff>::training(Default::default());
        let model = ActionClassifierConfig::new(3, 4, modality)
            .with_hidden_size(8)
            .init(ctx.device());
        (ctx, model)
    }

    fn train(
        ctx:     &ComputeContext<TestAutodiff>,
        model:   ActionClassifier<TestAutodiff>,
        batches: Vec<Batch<TestAutodiff>>,
    ) -> TrainingEpoch<ActionClassifier<TestAutodiff>> {
        let mut optim = AdamConfig::new().init();
        let loss_fn   = CrossEntropyLossConfig::new().init(ctx.device());
        run_training_epoch(ctx, model, &mut optim, &loss_fn, 1e-3, 0, batches, &EpochProgress::hidden())
            .unwrap()
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let output = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.9f32, 0.1, 0.2, 0.8, 0.7, 0.3], [3, 2]),
            &device,
        );
        let labels = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![0i64, 1, 1], [3]), &device);
        assert_eq!(count_correct(output, labels), 2);
    }

    #[test]
    fn test_fewer_than_ten_batches_reports_zero() {
        let (ctx, model) = setup(Modality::Single);
        let batches = random_batches(9, 4, 2, 3, 4, Modality::Single, ctx.device());
        let epoch = train(&ctx, model, batches);
        assert_eq!(epoch.summary.metric_samples, 0);
        assert_eq!(epoch.summary.total, 0);
        assert_eq!(epoch.summary.accuracy, 0.0);
        assert_eq!(epoch.summary.mean_loss, 0.0);
    }

    #[test]
    fn test_twenty_five_batches_sample_twice() {
        let (ctx, model) = setup(Modality::Single);
        let batches = random_batches(25, 4, 2, 3, 4, Modality::Single, ctx.device());
        let epoch = train(&ctx, model, batches);
        // batches 10 and 20 only
        assert_eq!(epoch.summary.metric_samples, 2);
        assert_eq!(epoch.summary.total, 8);
        assert!(epoch.summary.correct <= 8);
        assert!(epoch.summary.mean_loss > 0.0);
        assert!((0.0..=100.0).contains(&epoch.summary.accuracy));
    }

    #[test]
    fn test_multiple_of_ten_batches_sample_k_times() {
        let (ctx, model) = setup(Modality::Dual);
        let batches = random_batches(30, 2, 2, 3, 4, Modality::Dual, ctx.device());
        let epoch = train(&ctx, model, batches);
        assert_eq!(epoch.summary.metric_samples, 3);
        assert_eq!(epoch.summary.total, 6);
    }

    #[test]
    fn test_parameters_are_updated() {
        let (ctx, model) = setup(Modality::Single);
        let before  = parameters(&model);
        let batches = random_batches(3, 4, 2, 3, 4, Modality::Single, ctx.device());
        let epoch   = train(&ctx, model, batches);
        assert_ne!(parameters(&epoch.model), before);
    }

    #[test]
    fn test_frozen_encoders_are_not_updated() {
        let (ctx, model) = setup(Modality::Single);
        let model = model.freeze_encoders();
        let encoder_before = parameters(&model.stream_a.projection);
        let head_before    = parameters(&model.head);

        let batches = random_batches(3, 4, 2, 3, 4, Modality::Single, ctx.device());
        let epoch   = train(&ctx, model, batches);
        assert_eq!(parameters(&epoch.model.stream_a.projection), encoder_before);
        assert_ne!(parameters(&epoch.model.head), head_before);
    }

    #[test]
    fn test_mismatched_batch_aborts_epoch() {
        let (ctx, model) = setup(Modality::Dual);
        let batches = random_batches(2, 4, 2, 3, 4, Modality::Single, ctx.device());
        let mut optim = AdamConfig::new().init();
        let loss_fn   = CrossEntropyLossConfig::new().init(ctx.device());
        let result = run_training_epoch(
            &ctx, model, &mut optim, &loss_fn, 1e-3, 0, batches, &EpochProgress::hidden(),
        );
        assert!(result.is_err());
    }
}
