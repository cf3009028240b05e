// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, picks the backend and hands the
// work to Layer 2. The only `println!` output lives here.
//
//   actrec train --dataset ntu --data-dir data/ntu --experiment 1
//   actrec eval  --experiment 1 [--epoch 4]

pub mod commands;

use anyhow::Result;
use burn::backend::{Autodiff, NdArray, Wgpu};
use clap::Parser;
use commands::{BackendKind, Commands, EvalArgs, TrainArgs};

use crate::application::{eval_use_case::EvalUseCase, train_use_case::TrainUseCase};

type CpuBackend = NdArray<f32>;
type GpuBackend = Wgpu;

#[derive(Parser, Debug)]
#[command(
    name = "actrec",
    version,
    about = "Train and evaluate action recognition networks on preprocessed skeleton / video features."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args)  => run_eval(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let backend  = args.backend;
    let use_case = TrainUseCase::new(args.into());
    let cfg      = use_case.config();
    tracing::info!(
        "Training experiment {:02} on {} ({}) with the {:?} backend",
        cfg.experiment, cfg.dataset, cfg.dataset_root().display(), backend,
    );

    let report = match backend {
        BackendKind::Ndarray => use_case.execute::<Autodiff<CpuBackend>>(Default::default())?,
        BackendKind::Wgpu    => use_case.execute::<Autodiff<GpuBackend>>(Default::default())?,
    };

    println!(
        "Experiment {:02} test-set accuracy: {:.2}%",
        use_case.config().experiment,
        report.test_accuracy()
    );
    if let Some(files) = &report.test.results {
        println!("Results: {}, {}", files.outputs.display(), files.labels.display());
    }
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    let use_case = EvalUseCase::new(args.checkpoint_dir, args.experiment, args.epoch, !args.quiet);
    let outcome = match args.backend {
        BackendKind::Ndarray => use_case.execute::<CpuBackend>(Default::default())?,
        BackendKind::Wgpu    => use_case.execute::<GpuBackend>(Default::default())?,
    };
    println!("Experiment {:02} test-set accuracy: {:.2}%", args.experiment, outcome.accuracy());
    Ok(())
}
