// ============================================================
// Layer 4 — Action Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N `ActionSample`s
// into tensors on the target device.
//
//   Input:  Vec of N samples, each frames × features per stream
//   Output: Batch::Single { input [N, T, F], labels [N] }
//       or  Batch::Dual   { input_a, input_b [N, T, F], labels [N] }
//
// The batcher is built with the dataset's modality, so the
// variant is decided once per provider, not per batch.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ActionSample;
use crate::domain::modality::Modality;

// ─── Batch ────────────────────────────────────────────────────────────────────
/// One unit of iteration from a data provider.
/// Every tensor has the batch size as its leading dimension.
#[derive(Debug, Clone)]
pub enum Batch<B: Backend> {
    Single {
        input:  Tensor<B, 3>,
        labels: Tensor<B, 1, Int>,
    },
    Dual {
        input_a: Tensor<B, 3>,
        input_b: Tensor<B, 3>,
        labels:  Tensor<B, 1, Int>,
    },
}

/// The network-facing half of a batch.
#[derive(Debug, Clone)]
pub enum NetworkInput<B: Backend> {
    Single(Tensor<B, 3>),
    Dual(Tensor<B, 3>, Tensor<B, 3>),
}

impl<B: Backend> NetworkInput<B> {
    pub fn modality(&self) -> Modality {
        match self {
            NetworkInput::Single(_) => Modality::Single,
            NetworkInput::Dual(..)  => Modality::Dual,
        }
    }
}

impl<B: Backend> Batch<B> {
    pub fn modality(&self) -> Modality {
        match self {
            Batch::Single { .. } => Modality::Single,
            Batch::Dual { .. }   => Modality::Dual,
        }
    }

    pub fn labels(&self) -> &Tensor<B, 1, Int> {
        match self {
            Batch::Single { labels, .. } | Batch::Dual { labels, .. } => labels,
        }
    }

    /// Number of samples in the batch
    pub fn size(&self) -> usize {
        self.labels().dims()[0]
    }

    /// Move every tensor of the batch to `device`
    pub fn to_device(self, device: &B::Device) -> Self {
        match self {
            Batch::Single { input, labels } => Batch::Single {
                input:  input.to_device(device),
                labels: labels.to_device(device),
            },
            Batch::Dual { input_a, input_b, labels } => Batch::Dual {
                input_a: input_a.to_device(device),
                input_b: input_b.to_device(device),
                labels:  labels.to_device(device),
            },
        }
    }

    /// Split into network input and labels
    pub fn into_parts(self) -> (NetworkInput<B>, Tensor<B, 1, Int>) {
        match self {
            Batch::Single { input, labels } => (NetworkInput::Single(input), labels),
            Batch::Dual { input_a, input_b, labels } => {
                (NetworkInput::Dual(input_a, input_b), labels)
            }
        }
    }
}

// ─── ActionBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ActionBatcher<B: Backend> {
    device:   B::Device,
    modality: Modality,
    frames:   usize,
    features: usize,
}

impl<B: Backend> ActionBatcher<B> {
    pub fn new(device: B::Device, modality: Modality, frames: usize, features: usize) -> Self {
        Self { device, modality, frames, features }
    }

    fn stack<'a>(&self, streams: impl Iterator<Item = &'a [f32]>, count: usize) -> Tensor<B, 3> {
        let flat: Vec<f32> = streams.flat_map(|s| s.iter().copied()).collect();
        Tensor::from_data(
            TensorData::new(flat, [count, self.frames, self.features]),
            &self.device,
        )
    }
}

impl<B: Backend> Batcher<ActionSample, Batch<B>> for ActionBatcher<B> {
    fn batch(&self, items: Vec<ActionSample>) -> Batch<B> {
        let count = items.len();

        let labels: Vec<i64> = items.iter().map(|s| s.label).collect();
        let labels = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [count]), &self.device);

        let input_a = self.stack(items.iter().map(|s| s.input.as_slice()), count);

        match self.modality {
            Modality::Single => Batch::Single { input: input_a, labels },
            Modality::Dual => {
                // ActionDataset guarantees every sample carries the second stream
                let input_b = self.stack(items.iter().filter_map(|s| s.input_b.as_deref()), count);
                Batch::Dual { input_a, input_b, labels }
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBackend;

    fn items(count: usize, dual: bool) -> Vec<ActionSample> {
        (0..count)
            .map(|i| ActionSample {
                input:   vec![i as f32; 2 * 3],
                input_b: dual.then(|| vec![-(i as f32); 2 * 3]),
                label:   i as i64,
            })
            .collect()
    }

    #[test]
    fn test_single_batch_shapes() {
        let batcher = ActionBatcher::<TestBackend>::new(Default::default(), Modality::Single, 2, 3);
        let batch   = batcher.batch(items(4, false));
        assert_eq!(batch.modality(), Modality::Single);
        assert_eq!(batch.size(), 4);

        let (input, labels) = batch.into_parts();
        let NetworkInput::Single(input) = input else { panic!("expected single input") };
        assert_eq!(input.dims(), [4, 2, 3]);
        assert_eq!(labels.into_data().convert::<i64>().to_vec::<i64>().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_dual_batch_keeps_streams_apart() {
        let batcher = ActionBatcher::<TestBackend>::new(Default::default(), Modality::Dual, 2, 3);
        let (input, _) = batcher.batch(items(3, true)).into_parts();
        let NetworkInput::Dual(a, b) = input else { panic!("expected dual input") };
        assert_eq!(a.dims(), [3, 2, 3]);
        assert_eq!(b.dims(), [3, 2, 3]);

        let b = b.into_data().to_vec::<f32>().unwrap();
        // sample 2's second stream is all -2.0
        assert!(b[12..18].iter().all(|&v| v == -2.0));
    }
}
