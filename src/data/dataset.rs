use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;

use crate::domain::modality::Modality;

/// One action clip: `frames × features` values per stream, row-major,
/// plus its integer class label.
#[derive(Debug, Clone)]
pub struct ActionSample {
    pub input:   Vec<f32>,
    /// Second stream, present only for dual-input datasets
    pub input_b: Option<Vec<f32>>,
    pub label:   i64,
}

/// In-memory split (train, validation or test) of an action dataset.
///
/// Every sample has the same `frames × features` shape and the same
/// number of streams; this is checked once in `new`.
#[derive(Debug, Clone)]
pub struct ActionDataset {
    samples:  Vec<ActionSample>,
    frames:   usize,
    features: usize,
    modality: Modality,
}

impl ActionDataset {
    pub fn new(
        samples:  Vec<ActionSample>,
        frames:   usize,
        features: usize,
        modality: Modality,
    ) -> Result<Self> {
        let width = frames * features;
        for (i, s) in samples.iter().enumerate() {
            ensure!(s.label >= 0, "sample {i} has negative label {}", s.label);
            ensure!(
                s.input.len() == width,
                "sample {i} has {} values, expected {frames}x{features}",
                s.input.len()
            );
            match (modality, &s.input_b) {
                (Modality::Single, None) => {}
                (Modality::Dual, Some(b)) => ensure!(
                    b.len() == width,
                    "sample {i} second stream has {} values, expected {frames}x{features}",
                    b.len()
                ),
                (m, _) => anyhow::bail!("sample {i} does not match the {m} dataset"),
            }
        }
        Ok(Self { samples, frames, features, modality })
    }

    pub fn frames(&self)   -> usize    { self.frames }
    pub fn features(&self) -> usize    { self.features }
    pub fn modality(&self) -> Modality { self.modality }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Largest label + 1 (0 for an empty split)
    pub fn class_count(&self) -> usize {
        self.samples
            .iter()
            .map(|s| s.label as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Consume the split, returning its samples in order
    pub fn into_samples(self) -> Vec<ActionSample> {
        self.samples
    }
}

impl Dataset<ActionSample> for ActionDataset {
    fn get(&self, index: usize) -> Option<ActionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
