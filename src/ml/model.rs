use anyhow::{bail, ensure, Result};
use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::data::batcher::NetworkInput;
use crate::domain::modality::Modality;

/// What the epoch runners need from a network: the modality it
/// was built for and a forward pass to per-class scores.
pub trait ActionNetwork<B: Backend> {
    fn modality(&self) -> Modality;

    /// `[batch, frames, features]` stream(s) → `[batch, classes]` logits
    fn forward(&self, input: NetworkInput<B>) -> Result<Tensor<B, 2>>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ActionClassifierConfig {
    pub input_features: usize,
    pub num_classes:    usize,
    pub modality:       Modality,
    #[config(default = 256)]
    pub hidden_size:    usize,
    #[config(default = 0.5)]
    pub dropout:        f64,
}

impl ActionClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ActionClassifier<B> {
        let encoder = || StreamEncoder {
            projection: LinearConfig::new(self.input_features, self.hidden_size).init(device),
        };
        let stream_a = encoder();
        let stream_b = match self.modality {
            Modality::Single => None,
            Modality::Dual   => Some(encoder()),
        };
        let fused = self.hidden_size * self.modality.stream_count();
        ActionClassifier {
            stream_a,
            stream_b,
            dropout: DropoutConfig::new(self.dropout).init(),
            head: LinearConfig::new(fused, self.num_classes).init(device),
            input_features: self.input_features,
        }
    }
}

/// Per-frame projection, ReLU, then mean over time.
#[derive(Module, Debug)]
pub struct StreamEncoder<B: Backend> {
    pub projection: Linear<B>,
}

impl<B: Backend> StreamEncoder<B> {
    /// `[batch, frames, features]` → `[batch, hidden]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, _, _] = x.dims();
        let h = relu(self.projection.forward(x));
        let [_, _, hidden] = h.dims();
        h.mean_dim(1).reshape([batch, hidden])
    }
}

/// Baseline one- or two-stream action classifier. Two streams
/// (e.g. RGB + optical flow) are fused by concatenating their
/// pooled features before the classification head.
#[derive(Module, Debug)]
pub struct ActionClassifier<B: Backend> {
    pub stream_a:       StreamEncoder<B>,
    pub stream_b:       Option<StreamEncoder<B>>,
    pub dropout:        Dropout,
    pub head:           Linear<B>,
    pub input_features: usize,
}

impl<B: Backend> ActionClassifier<B> {
    /// Stop gradient flow into the stream encoders; only the head
    /// stays trainable. Frozen parameters get no gradients, so the
    /// optimizer never touches them.
    pub fn freeze_encoders(self) -> Self {
        Self {
            stream_a: self.stream_a.no_grad(),
            stream_b: self.stream_b.map(|s| s.no_grad()),
            ..self
        }
    }

    fn check_width(&self, x: &Tensor<B, 3>) -> Result<()> {
        let [_, _, features] = x.dims();
        ensure!(
            features == self.input_features,
            "input has {features} features per frame, network expects {}",
            self.input_features
        );
        Ok(())
    }
}

impl<B: Backend> ActionNetwork<B> for ActionClassifier<B> {
    fn modality(&self) -> Modality {
        match self.stream_b {
            Some(_) => Modality::Dual,
            None    => Modality::Single,
        }
    }

    fn forward(&self, input: NetworkInput<B>) -> Result<Tensor<B, 2>> {
        let pooled = match (input, &self.stream_b) {
            (NetworkInput::Single(x), None) => {
                self.check_width(&x)?;
                self.stream_a.forward(x)
            }
            (NetworkInput::Dual(a, b), Some(encoder_b)) => {
                self.check_width(&a)?;
                self.check_width(&b)?;
                ensure!(
                    a.dims()[0] == b.dims()[0],
                    "stream batch sizes differ: {} vs {}",
                    a.dims()[0],
                    b.dims()[0]
                );
                Tensor::cat(vec![self.stream_a.forward(a), encoder_b.forward(b)], 1)
            }
            (input, _) => bail!(
                "{} network cannot take a {} batch",
                self.modality(),
                input.modality()
            ),
        };
        Ok(self.head.forward(self.dropout.forward(pooled)))
    }
}
