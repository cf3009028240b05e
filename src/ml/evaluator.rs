// ============================================================
// Layer 5 — Evaluation Epoch
// ============================================================
// One forward-only pass over evaluation batches with an
// inference-mode network (inner backend: no autodiff graph,
// dropout disabled). Unlike training, every batch counts
// toward the accuracy.
//
// In Testing mode the raw logits and labels of every batch are
// buffered and, once the pass completes, concatenated in batch
// order and handed to the `ResultStore`. A failing batch aborts
// the pass before anything is written.

use anyhow::{anyhow, ensure, Context, Result};
use burn::prelude::*;
use std::fmt;

use crate::data::batcher::Batch;
use crate::domain::metrics::{EpochSummary, RunningMetrics};
use crate::infra::{
    npy::NpyArray,
    results::{ResultFiles, ResultStore},
};
use crate::ml::{
    context::{ComputeContext, ExecutionMode},
    model::ActionNetwork,
    progress::EpochProgress,
    trainer::count_correct,
};

/// Which kind of evaluation pass this is.
pub enum EvalMode<'a> {
    /// Accuracy only
    Validation,
    /// Accuracy plus persisted logits/labels
    Testing(&'a ResultStore),
}

impl fmt::Display for EvalMode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalMode::Validation => write!(f, "Validation"),
            EvalMode::Testing(_) => write!(f, "Testing"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub summary: EpochSummary,
    /// Set in Testing mode only
    pub results: Option<ResultFiles>,
}

impl EvalOutcome {
    pub fn accuracy(&self) -> f64 {
        self.summary.accuracy
    }
}

pub fn run_eval_epoch<B, M, I>(
    ctx:      &ComputeContext<B>,
    model:    &M,
    batches:  I,
    mode:     EvalMode<'_>,
    progress: &EpochProgress,
) -> Result<EvalOutcome>
where
    B: Backend,
    M: ActionNetwork<B>,
    I: IntoIterator<Item = Batch<B>>,
{
    ensure!(
        ctx.mode() == ExecutionMode::Inference,
        "evaluation needs an inference context"
    );

    let keep_outputs = matches!(mode, EvalMode::Testing(_));
    let mut metrics  = RunningMetrics::new();
    let mut outputs: Vec<Tensor<B, 2>>      = Vec::new();
    let mut labels:  Vec<Tensor<B, 1, Int>> = Vec::new();

    for (index, batch) in batches.into_iter().enumerate() {
        let (input, batch_labels) = ctx.place_batch(batch).into_parts();
        let output = model
            .forward(input)
            .with_context(|| format!("{mode} batch {}", index + 1))?;

        let batch_size = batch_labels.dims()[0];
        metrics.record_predictions(count_correct(output.clone(), batch_labels.clone()), batch_size);
        progress.report_accuracy(metrics.accuracy());
        progress.advance();

        if keep_outputs {
            outputs.push(output);
            labels.push(batch_labels);
        }
    }
    progress.finish_and_clear();

    let summary = metrics.summary();
    tracing::info!(
        "{mode}: {}/{} correct, accuracy {:.4}%",
        summary.correct, summary.total, summary.accuracy
    );

    let results = match mode {
        EvalMode::Validation     => None,
        EvalMode::Testing(store) => {
            let outputs = concat_outputs(outputs)?;
            let labels  = concat_labels(labels)?;
            Some(store.save(&outputs, &labels, summary.accuracy)?)
        }
    };

    Ok(EvalOutcome { summary, results })
}

fn concat_outputs<B: Backend>(outputs: Vec<Tensor<B, 2>>) -> Result<NpyArray<f32>> {
    if outputs.is_empty() {
        return NpyArray::new(vec![0, 0], Vec::new());
    }
    let data   = Tensor::cat(outputs, 0).into_data().convert::<f32>();
    let shape  = data.shape.clone();
    let values = data
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read test outputs: {e:?}"))?;
    NpyArray::new(shape, values)
}

fn concat_labels<B: Backend>(labels: Vec<Tensor<B, 1, Int>>) -> Result<NpyArray<i64>> {
    if labels.is_empty() {
        return NpyArray::new(vec![0], Vec::new());
    }
    let data   = Tensor::cat(labels, 0).into_data().convert::<i64>();
    let shape  = data.shape.clone();
    let values = data
        .to_vec::<i64>()
        .map_err(|e| anyhow!("cannot read test labels: {e:?}"))?;
    NpyArray::new(shape, values)
}
