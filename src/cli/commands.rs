// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `probe` and `vocab` and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::ExperimentConfig;
use crate::domain::task::DiagnosticTask;
use crate::ml::{
    architectures::ArchitectureKind,
    recurrent::RecurrentKind,
    trainer::OptimizerKind,
    transplant::WeightGroup,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an architecture, optionally on top of a pretrained one
    Train(TrainArgs),

    /// Train a base architecture, then diagnostic classifiers on its hidden states
    Probe(ProbeArgs),

    /// Print the symbol → id map
    Vocab(VocabArgs),
}

/// Tensor backend; both are wrapped in Burn's Autodiff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// CPU
    Ndarray,
    /// GPU via wgpu
    Wgpu,
}

/// Digits and operators of the dmap.
#[derive(Args, Debug, Clone)]
pub struct VocabArgs {
    #[arg(long, default_value_t = -10, allow_hyphen_values = true)]
    pub digits_min: i64,

    #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
    pub digits_max: i64,

    #[arg(long, value_delimiter = ',', default_value = "+,-")]
    pub operators: Vec<String>,
}

/// Settings shared by `train` and `probe`.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// File or directory of training expressions
    #[arg(long)]
    pub train_data: PathBuf,

    /// Test files, evaluated after training (repeatable)
    #[arg(long)]
    pub test_data: Vec<PathBuf>,

    /// Directory for the run artefacts
    #[arg(long, default_value = "runs/latest")]
    pub out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = RecurrentKind::Gru)]
    pub recurrent: RecurrentKind,

    /// Embedding width
    #[arg(long, default_value_t = 2)]
    pub input_size: usize,

    #[arg(long, default_value_t = 15)]
    pub size_hidden: usize,

    /// Pad every expression to this length (never truncates)
    #[arg(long)]
    pub input_length: Option<usize>,

    #[command(flatten)]
    pub vocab: VocabArgs,

    #[arg(long, default_value_t = 0.0)]
    pub dropout_recurrent: f64,

    /// Let the recurrence read padding instead of skipping it
    #[arg(long)]
    pub no_mask_zero: bool,

    #[arg(long, default_value_t = 24)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    #[arg(long, value_enum, default_value_t = OptimizerKind::Adam)]
    pub optimizer: OptimizerKind,

    /// Fraction of training expressions held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub validation_split: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log progress every n epochs
    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    #[arg(long, default_value_t = 100)]
    pub pretrain_epochs: usize,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, value_enum, default_value_t = ArchitectureKind::ScalarPrediction)]
    pub architecture: ArchitectureKind,

    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long)]
    pub fix_embeddings: bool,

    #[arg(long)]
    pub fix_recurrent: bool,

    #[arg(long)]
    pub fix_classifier: bool,

    /// Train this architecture first and reuse its weights
    #[arg(long, value_enum)]
    pub pretrain: Option<ArchitectureKind>,

    /// Weight groups to copy from the pretrained model
    #[arg(long, value_enum, value_delimiter = ',', default_value = "recurrent,embeddings,classifier")]
    pub copy_weights: Vec<WeightGroup>,

    /// Probe targets (diagnostic architecture only)
    #[arg(long, value_enum, value_delimiter = ',', default_value = "grammatical")]
    pub tasks: Vec<DiagnosticTask>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Architecture whose hidden states are probed
    #[arg(long, value_enum, default_value_t = ArchitectureKind::Seq2Seq)]
    pub base: ArchitectureKind,

    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, value_enum, value_delimiter = ',', default_value = "intermediate_locally,subtracting")]
    pub tasks: Vec<DiagnosticTask>,
}

impl From<ModelArgs> for ExperimentConfig {
    fn from(a: ModelArgs) -> Self {
        ExperimentConfig {
            train_data:        a.train_data,
            test_data:         a.test_data,
            out_dir:           a.out_dir,
            recurrent:         a.recurrent,
            input_size:        a.input_size,
            size_hidden:       a.size_hidden,
            input_length:      a.input_length,
            digits_min:        a.vocab.digits_min,
            digits_max:        a.vocab.digits_max,
            operators:         a.vocab.operators,
            dropout_recurrent: a.dropout_recurrent,
            mask_zero:         !a.no_mask_zero,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            learning_rate:     a.learning_rate,
            optimizer:         a.optimizer,
            validation_split:  a.validation_split,
            seed:              a.seed,
            log_every:         a.log_every,
            pretrain_epochs:   a.pretrain_epochs,
            ..ExperimentConfig::default()
        }
    }
}

/// Convert CLI TrainArgs into the application-layer ExperimentConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for ExperimentConfig {
    fn from(a: TrainArgs) -> Self {
        ExperimentConfig {
            architecture:   a.architecture,
            fix_embeddings: a.fix_embeddings,
            fix_recurrent:  a.fix_recurrent,
            fix_classifier: a.fix_classifier,
            pretrain:       a.pretrain,
            copy_weights:   a.copy_weights,
            tasks:          a.tasks,
            ..a.model.into()
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_become_config() {
        let cli = Cli::try_parse_from([
            "recurrent-arithmetic", "train",
            "--architecture", "comparison",
            "--train-data", "data/train.txt",
            "--test-data", "data/L7.txt", "--test-data", "data/L9.txt",
            "--recurrent", "lstm",
            "--digits-min", "-5",
            "--pretrain", "scalar",
            "--copy-weights", "recurrent,embeddings",
            "--fix-recurrent",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: ExperimentConfig = args.into();
        assert_eq!(cfg.architecture, ArchitectureKind::ComparisonTraining);
        assert_eq!(cfg.test_data.len(), 2);
        assert_eq!(cfg.recurrent, RecurrentKind::Lstm);
        assert_eq!(cfg.digits_min, -5);
        assert_eq!(cfg.pretrain, Some(ArchitectureKind::ScalarPrediction));
        assert_eq!(cfg.copy_weights, vec![WeightGroup::Recurrent, WeightGroup::Embeddings]);
        assert!(cfg.fix_recurrent && !cfg.fix_embeddings);
        assert!(cfg.mask_zero);
    }

    #[test]
    fn test_probe_tasks_and_backend() {
        let cli = Cli::try_parse_from([
            "recurrent-arithmetic", "--backend", "ndarray", "probe",
            "--train-data", "data/train.txt",
            "--tasks", "minus2depth,depth",
        ])
        .unwrap();
        assert_eq!(cli.backend, BackendKind::Ndarray);

        let Commands::Probe(args) = cli.command else { panic!("expected probe") };
        assert_eq!(args.base, ArchitectureKind::Seq2Seq);
        assert_eq!(args.tasks, vec![DiagnosticTask::Minus2Depth, DiagnosticTask::Depth]);
    }
}
