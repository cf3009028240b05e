// Shared fixtures for the unit tests.

use burn::{nn::Linear, prelude::*};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;

use crate::data::{
    batcher::{Batch, NetworkInput},
    dataset::{ActionDataset, ActionSample},
};
use crate::domain::modality::Modality;
use crate::infra::npy::NpyArray;
use crate::ml::model::{ActionClassifier, ActionNetwork};

pub type TestBackend  = burn::backend::NdArray<f32>;
pub type TestAutodiff = burn::backend::Autodiff<TestBackend>;

// ─── Parameter snapshots ──────────────────────────────────────────────────────

pub trait FlatParameters {
    fn flat_parameters(&self) -> Vec<f32>;
}

fn values<B: Backend, const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
    t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
}

impl<B: Backend> FlatParameters for Linear<B> {
    fn flat_parameters(&self) -> Vec<f32> {
        let mut out = values(self.weight.val());
        if let Some(bias) = &self.bias {
            out.extend(values(bias.val()));
        }
        out
    }
}

impl<B: Backend> FlatParameters for ActionClassifier<B> {
    fn flat_parameters(&self) -> Vec<f32> {
        let mut out = self.stream_a.projection.flat_parameters();
        if let Some(stream_b) = &self.stream_b {
            out.extend(stream_b.projection.flat_parameters());
        }
        out.extend(self.head.flat_parameters());
        out
    }
}

/// Every parameter value, in a fixed order
pub fn parameters<P: FlatParameters>(module: &P) -> Vec<f32> {
    module.flat_parameters()
}

// ─── Batches ──────────────────────────────────────────────────────────────────

/// Seeded random inputs and labels.
pub fn random_batches<B: Backend>(
    count:      usize,
    batch_size: usize,
    frames:     usize,
    features:   usize,
    classes:    usize,
    modality:   Modality,
    device:     &B::Device,
) -> Vec<Batch<B>> {
    let mut rng = StdRng::seed_from_u64(7);
    let stream = |rng: &mut StdRng| {
        let v: Vec<f32> = (0..batch_size * frames * features).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Tensor::<B, 3>::from_data(TensorData::new(v, [batch_size, frames, features]), device)
    };
    (0..count)
        .map(|_| {
            let labels: Vec<i64> = (0..batch_size).map(|_| rng.gen_range(0..classes as i64)).collect();
            let labels = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);
            match modality {
                Modality::Single => Batch::Single { input: stream(&mut rng), labels },
                Modality::Dual   => Batch::Dual {
                    input_a: stream(&mut rng),
                    input_b: stream(&mut rng),
                    labels,
                },
            }
        })
        .collect()
}

/// Batches whose first frame is the one-hot encoding of the label,
/// `classes` features per frame, two frames per sample.
pub fn labelled_batches<B: Backend>(
    count:      usize,
    batch_size: usize,
    classes:    usize,
    modality:   Modality,
    device:     &B::Device,
) -> Vec<Batch<B>> {
    (0..count)
        .map(|k| {
            let labels: Vec<i64> = (0..batch_size)
                .map(|j| ((k * batch_size + j * 7) % classes) as i64)
                .collect();
            let mut input = vec![0.0f32; batch_size * 2 * classes];
            for (j, &label) in labels.iter().enumerate() {
                input[j * 2 * classes + label as usize] = 1.0;
            }
            let input  = Tensor::<B, 3>::from_data(TensorData::new(input, [batch_size, 2, classes]), device);
            let labels = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);
            match modality {
                Modality::Single => Batch::Single { input, labels },
                Modality::Dual   => Batch::Dual { input_a: input.clone(), input_b: input, labels },
            }
        })
        .collect()
}

/// Scores each sample with the first frame of its (first) stream,
/// so `labelled_batches` are always classified correctly.
pub struct OracleNetwork {
    classes: usize,
}

impl OracleNetwork {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl<B: Backend> ActionNetwork<B> for OracleNetwork {
    fn modality(&self) -> Modality {
        Modality::Single
    }

    fn forward(&self, input: NetworkInput<B>) -> anyhow::Result<Tensor<B, 2>> {
        let x = match input {
            NetworkInput::Single(x) | NetworkInput::Dual(x, _) => x,
        };
        let [batch, _, features] = x.dims();
        anyhow::ensure!(features == self.classes, "oracle expects {} features", self.classes);
        Ok(x.slice([0..batch, 0..1, 0..features]).reshape([batch, features]))
    }
}

// ─── Datasets ─────────────────────────────────────────────────────────────────

fn samples(count: usize, frames: usize, features: usize, classes: usize, dual: bool) -> Vec<ActionSample> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|i| ActionSample {
            input:   (0..frames * features).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            input_b: dual.then(|| (0..frames * features).map(|_| rng.gen_range(-1.0..1.0)).collect()),
            label:   (i % classes) as i64,
        })
        .collect()
}

pub fn sample_dataset(
    count:    usize,
    frames:   usize,
    features: usize,
    classes:  usize,
    modality: Modality,
) -> ActionDataset {
    let dual = modality == Modality::Dual;
    ActionDataset::new(samples(count, frames, features, classes, dual), frames, features, modality).unwrap()
}

/// Write `{split}_inputs.npy`, `{split}_labels.npy` (and
/// `{split}_inputs_b.npy` when `dual`) under `root`.
pub fn write_npy_split(
    root:     &Path,
    split:    &str,
    count:    usize,
    frames:   usize,
    features: usize,
    classes:  usize,
    dual:     bool,
) {
    let samples = samples(count, frames, features, classes, dual);
    let shape   = vec![count, frames, features];

    let a: Vec<f32> = samples.iter().flat_map(|s| s.input.clone()).collect();
    NpyArray::new(shape.clone(), a).unwrap()
        .write(&root.join(format!("{split}_inputs.npy"))).unwrap();
    if dual {
        let b: Vec<f32> = samples.iter().flat_map(|s| s.input_b.clone().unwrap()).collect();
        NpyArray::new(shape, b).unwrap()
            .write(&root.join(format!("{split}_inputs_b.npy"))).unwrap();
    }
    let labels: Vec<i64> = samples.iter().map(|s| s.label).collect();
    NpyArray::new(vec![count], labels).unwrap()
        .write(&root.join(format!("{split}_labels.npy"))).unwrap();
}
