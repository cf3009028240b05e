// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// `train` runs a full experiment, `eval` repeats the Testing
// pass of one that already finished. Both pick a backend.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::ExperimentConfig;
use crate::domain::experiment::DatasetKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a network, checkpoint every epoch, then evaluate on the test split
    Train(TrainArgs),

    /// Evaluate a saved checkpoint on the test split
    Eval(EvalArgs),
}

/// Compute backend
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU (ndarray)
    Ndarray,
    /// GPU via wgpu
    Wgpu,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetArg {
    Ntu,
    Sysu,
}

impl From<DatasetArg> for DatasetKind {
    fn from(d: DatasetArg) -> Self {
        match d {
            DatasetArg::Ntu  => DatasetKind::Ntu,
            DatasetArg::Sysu => DatasetKind::Sysu,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Benchmark the data directory holds
    #[arg(long, value_enum, default_value_t = DatasetArg::Ntu)]
    pub dataset: DatasetArg,

    /// Directory with {train,test}_{inputs,labels}.npy
    /// (sysu: the parent of the split_NN directories)
    #[arg(long, default_value = "data/ntu")]
    pub data_dir: String,

    /// Experiment number, used in every output file name
    #[arg(long, default_value_t = 1)]
    pub experiment: u32,

    /// Cross-validation split (required for sysu)
    #[arg(long)]
    pub split: Option<u32>,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    /// Epochs between learning-rate decays
    #[arg(long, default_value_t = 5)]
    pub lr_step: usize,

    /// Multiplicative learning-rate decay
    #[arg(long, default_value_t = 0.5)]
    pub lr_gamma: f64,

    /// Width of each stream encoder
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Where output/labels arrays of the test pass are written
    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Seed for the training shuffle and the validation split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Hold out this share of the training split and validate every epoch
    #[arg(long)]
    pub validation_fraction: Option<f64>,

    /// Checkpoint to load before training
    #[arg(long)]
    pub init_from: Option<String>,

    /// Train the classification head only
    #[arg(long)]
    pub freeze_encoders: bool,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,

    /// Hide progress bars
    #[arg(long)]
    pub quiet: bool,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for ExperimentConfig {
    fn from(a: TrainArgs) -> Self {
        ExperimentConfig {
            dataset:             a.dataset.into(),
            data_dir:            a.data_dir,
            experiment:          a.experiment,
            split:               a.split,
            epochs:              a.epochs,
            batch_size:          a.batch_size,
            learning_rate:       a.lr,
            lr_step_size:        a.lr_step,
            lr_gamma:            a.lr_gamma,
            hidden_size:         a.hidden_size,
            dropout:             a.dropout,
            checkpoint_dir:      a.checkpoint_dir,
            results_dir:         a.results_dir,
            seed:                a.seed,
            validation_fraction: a.validation_fraction,
            init_from:           a.init_from,
            freeze_encoders:     a.freeze_encoders,
            show_progress:       !a.quiet,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[arg(long, default_value_t = 1)]
    pub experiment: u32,

    /// Evaluate the checkpoint of this epoch instead of the final one
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Directory the experiment was trained into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,

    #[arg(long)]
    pub quiet: bool,
}
