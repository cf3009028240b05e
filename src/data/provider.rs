// ============================================================
// Layer 4 — Dataset Provider
// ============================================================
// Hands the training loop its data loaders. The orchestrator
// only sees the `DatasetProvider` trait; `ActionDatasetProvider`
// is the concrete implementation over preprocessed arrays:
//
//   <root>/
//     train_inputs.npy     f32 [N, frames, features]
//     train_inputs_b.npy   f32 [N, frames, features]   (dual only)
//     train_labels.npy     int [N]
//     test_inputs.npy
//     test_inputs_b.npy                                (dual only)
//     test_labels.npy
//
// The modality is resolved here, once: a root with
// `*_inputs_b.npy` files is a dual-input dataset.

use anyhow::{bail, ensure, Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::{path::Path, sync::Arc};

use crate::data::{
    batcher::{ActionBatcher, Batch},
    dataset::{ActionDataset, ActionSample},
    splitter::split_train_val,
};
use crate::domain::modality::Modality;
use crate::infra::npy::{read_labels, NpyArray};

/// Source of train / validation / test batches for one experiment.
pub trait DatasetProvider {
    fn modality(&self) -> Modality;

    /// Width of one frame of one input stream
    fn input_features(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Shuffled training batches
    fn train_loader<B: Backend>(&self, device: &B::Device) -> BatchLoader<B>;

    /// Held-out part of the training split, when one was requested
    fn validation_loader<B: Backend>(&self, device: &B::Device) -> Option<BatchLoader<B>>;

    /// Test batches in storage order
    fn test_loader<B: Backend>(&self, device: &B::Device) -> BatchLoader<B>;
}

/// A Burn data loader plus the number of batches one pass yields.
pub struct BatchLoader<B: Backend> {
    loader:  Arc<dyn DataLoader<Batch<B>>>,
    batches: usize,
}

impl<B: Backend> BatchLoader<B> {
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// One full pass over the split
    pub fn iter(&self) -> impl Iterator<Item = Batch<B>> + '_ {
        self.loader.iter()
    }
}

/// Loader knobs shared by every split.
#[derive(Debug, Clone, Copy)]
pub struct ProviderOptions {
    pub batch_size:          usize,
    /// Seed for the training shuffle and the validation split
    pub seed:                u64,
    /// Share of the training split held out for validation
    pub validation_fraction: Option<f64>,
}

pub struct ActionDatasetProvider {
    train:      ActionDataset,
    validation: Option<ActionDataset>,
    test:       ActionDataset,
    options:    ProviderOptions,
}

impl ActionDatasetProvider {
    /// Build from in-memory splits. Both splits must agree on
    /// modality and sample shape.
    pub fn new(train: ActionDataset, test: ActionDataset, options: ProviderOptions) -> Result<Self> {
        ensure!(options.batch_size > 0, "batch size must be positive");
        ensure!(
            train.modality() == test.modality(),
            "train split is {} but test split is {}",
            train.modality(),
            test.modality()
        );
        ensure!(
            (train.frames(), train.features()) == (test.frames(), test.features()),
            "train samples are {}x{} but test samples are {}x{}",
            train.frames(), train.features(), test.frames(), test.features()
        );

        let (train, validation) = match options.validation_fraction {
            Some(fraction) => {
                ensure!(
                    (0.0..1.0).contains(&fraction),
                    "validation fraction must be in [0, 1), got {fraction}"
                );
                let (frames, features, modality) = (train.frames(), train.features(), train.modality());
                let (kept, held_out) = split_train_val(train.into_samples(), fraction, options.seed);
                (
                    ActionDataset::new(kept, frames, features, modality)?,
                    Some(ActionDataset::new(held_out, frames, features, modality)?),
                )
            }
            None => (train, None),
        };

        tracing::info!(
            "Dataset ready: {} train, {} validation, {} test samples ({}, {} frames x {} features)",
            train.sample_count(),
            validation.as_ref().map_or(0, |v| v.sample_count()),
            test.sample_count(),
            train.modality(),
            train.frames(),
            train.features(),
        );
        Ok(Self { train, validation, test, options })
    }

    /// Load `train_*` and `test_*` arrays from `root`.
    pub fn from_dir(root: &Path, options: ProviderOptions) -> Result<Self> {
        tracing::info!("Loading dataset arrays from '{}'", root.display());
        let train = load_split(root, "train")?;
        let test  = load_split(root, "test")?;
        Self::new(train, test, options)
    }

    fn loader<B: Backend>(&self, split: &ActionDataset, device: &B::Device, shuffle: bool) -> BatchLoader<B> {
        let batcher = ActionBatcher::<B>::new(
            device.clone(),
            split.modality(),
            split.frames(),
            split.features(),
        );
        let builder = DataLoaderBuilder::new(batcher).batch_size(self.options.batch_size);
        let loader = if shuffle {
            builder.shuffle(self.options.seed).build(split.clone())
        } else {
            builder.build(split.clone())
        };
        BatchLoader {
            loader,
            batches: split.sample_count().div_ceil(self.options.batch_size),
        }
    }
}

impl DatasetProvider for ActionDatasetProvider {
    fn modality(&self) -> Modality {
        self.train.modality()
    }

    fn input_features(&self) -> usize {
        self.train.features()
    }

    fn num_classes(&self) -> usize {
        self.train.class_count()
            .max(self.test.class_count())
            .max(self.validation.as_ref().map_or(0, |v| v.class_count()))
    }

    fn train_loader<B: Backend>(&self, device: &B::Device) -> BatchLoader<B> {
        self.loader(&self.train, device, true)
    }

    fn validation_loader<B: Backend>(&self, device: &B::Device) -> Option<BatchLoader<B>> {
        self.validation.as_ref().map(|v| self.loader(v, device, false))
    }

    fn test_loader<B: Backend>(&self, device: &B::Device) -> BatchLoader<B> {
        self.loader(&self.test, device, false)
    }
}

// ─── Array loading ────────────────────────────────────────────────────────────

fn load_split(root: &Path, split: &str) -> Result<ActionDataset> {
    let inputs  = NpyArray::<f32>::read(&root.join(format!("{split}_inputs.npy")))?;
    let labels  = read_labels(&root.join(format!("{split}_labels.npy")))?;
    let b_path  = root.join(format!("{split}_inputs_b.npy"));
    let inputs_b = if b_path.exists() {
        Some(NpyArray::<f32>::read(&b_path)?)
    } else {
        None
    };

    let &[count, frames, features] = inputs.shape.as_slice() else {
        bail!("{split}_inputs.npy must be [samples, frames, features], got {:?}", inputs.shape);
    };
    ensure!(
        labels.shape == [count],
        "{split}_labels.npy has shape {:?}, expected [{count}]",
        labels.shape
    );
    if let Some(b) = &inputs_b {
        ensure!(
            b.shape == inputs.shape,
            "{split}_inputs_b.npy has shape {:?}, expected {:?}",
            b.shape,
            inputs.shape
        );
    }

    let width    = frames * features;
    let modality = if inputs_b.is_some() { Modality::Dual } else { Modality::Single };
    let samples: Vec<ActionSample> = (0..count)
        .map(|i| ActionSample {
            input:   inputs.data[i * width..(i + 1) * width].to_vec(),
            input_b: inputs_b.as_ref().map(|b| b.data[i * width..(i + 1) * width].to_vec()),
            label:   labels.data[i],
        })
        .collect();

    ActionDataset::new(samples, frames, features, modality)
        .with_context(|| format!("Invalid {split} split in '{}'", root.display()))
}
