// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`: trains one architecture (optionally pretrained)
//   2. `probe`: trains diagnostic classifiers on a trained model
//   3. `vocab`: prints the dmap
//
// The backend is picked here and nowhere else: the application
// layer is generic over Burn's AutodiffBackend.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use clap::Parser;
use commands::{BackendKind, Commands, ProbeArgs, TrainArgs, VocabArgs};

use crate::application::{
    experiment::ExperimentReport,
    probe_use_case::ProbeUseCase,
    train_use_case::{ExperimentConfig, TrainUseCase},
};
use crate::domain::vocab::Dmap;
use crate::ml::evaluator::evaluation_string;

type CpuBackend = Autodiff<NdArray>;
type GpuBackend = Autodiff<Wgpu>;

#[derive(Parser, Debug)]
#[command(
    name = "recurrent-arithmetic",
    version = "0.1.0",
    about = "Train recurrent networks on arithmetic expressions and probe their hidden states."
)]
pub struct Cli {
    /// Tensor backend
    #[arg(long, value_enum, global = true, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin: it only routes, never computes.
    pub fn run(self) -> Result<()> {
        let backend = self.backend;
        match self.command {
            Commands::Train(args) => Self::run_train(backend, args),
            Commands::Probe(args) => Self::run_probe(backend, args),
            Commands::Vocab(args) => Self::run_vocab(args),
        }
    }

    fn run_train(backend: BackendKind, args: TrainArgs) -> Result<()> {
        tracing::info!("Training {} on '{}'", args.architecture, args.model.train_data.display());

        // Convert CLI args → application config (separates presentation from domain)
        let use_case = TrainUseCase::new(args.into());
        let report = match backend {
            BackendKind::Ndarray => use_case.execute::<CpuBackend>(&NdArrayDevice::default())?,
            BackendKind::Wgpu    => use_case.execute::<GpuBackend>(&WgpuDevice::default())?,
        };
        print_report(&report);
        Ok(())
    }

    fn run_probe(backend: BackendKind, args: ProbeArgs) -> Result<()> {
        let mut config: ExperimentConfig = args.model.into();
        config.tasks = args.tasks;

        let use_case = ProbeUseCase::new(args.base, config);
        let report = match backend {
            BackendKind::Ndarray => use_case.execute::<CpuBackend>(&NdArrayDevice::default())?,
            BackendKind::Wgpu    => use_case.execute::<GpuBackend>(&WgpuDevice::default())?,
        };
        print_report(&report);
        Ok(())
    }

    fn run_vocab(args: VocabArgs) -> Result<()> {
        let dmap = Dmap::new(args.digits_min..=args.digits_max, &args.operators);
        println!("id\tsymbol");
        println!("0\t<pad>");
        for (i, symbol) in dmap.symbols().iter().enumerate() {
            println!("{}\t{}", i + 1, symbol);
        }
        println!("input dimension: {}", dmap.input_dim());
        Ok(())
    }
}

fn print_report(report: &ExperimentReport) {
    for stage in &report.stages {
        println!("\n== {} ({}) ==", stage.stage, stage.architecture);
        println!("{}", stage.history.summary());
        if !stage.evaluation.is_empty() {
            println!("{}", evaluation_string(&stage.evaluation));
        }
    }
}
