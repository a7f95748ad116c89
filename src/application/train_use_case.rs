// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Build the dmap                        (Layer 3 - domain)
//   Step 2: Load train / test expressions         (Layer 4 - data)
//   Step 3: Save config + dmap                    (Layer 6 - infra)
//   Step 4: Optionally pretrain another           (Layer 5 - ml)
//           architecture
//   Step 5: Build the target architecture,        (Layer 5 - ml)
//           reusing the selected weight groups
//   Step 6: Train, evaluate, store artefacts      (Layer 5/6)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::experiment::{self, ExperimentReport};
use crate::domain::{task::DiagnosticTask, vocab::Dmap};
use crate::ml::{
    architectures::ArchitectureKind,
    recurrent::RecurrentKind,
    trainer::{FitOptions, OptimizerKind},
    transplant::WeightGroup,
};

// ─── Experiment Configuration ────────────────────────────────────────────────
// All settings of a run. Serialisable so the run directory records
// exactly what produced its results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub architecture:      ArchitectureKind,
    pub train_data:        PathBuf,
    pub test_data:         Vec<PathBuf>,
    pub out_dir:           PathBuf,

    pub recurrent:         RecurrentKind,
    /// Embedding width
    pub input_size:        usize,
    pub size_hidden:       usize,
    /// Pad length; None = pretrained model's, else the longest expression
    pub input_length:      Option<usize>,
    pub digits_min:        i64,
    pub digits_max:        i64,
    pub operators:         Vec<String>,
    pub dropout_recurrent: f64,
    pub mask_zero:         bool,

    pub batch_size:        usize,
    pub epochs:            usize,
    pub learning_rate:     f64,
    pub optimizer:         OptimizerKind,
    /// Fraction of the training expressions held out for validation
    pub validation_split:  f64,
    pub seed:              u64,
    pub log_every:         usize,

    pub fix_embeddings:    bool,
    pub fix_recurrent:     bool,
    pub fix_classifier:    bool,

    /// Architecture to train first and reuse weights from
    pub pretrain:          Option<ArchitectureKind>,
    pub pretrain_epochs:   usize,
    pub copy_weights:      Vec<WeightGroup>,
    /// Probe targets of a diagnostic classifier
    pub tasks:             Vec<DiagnosticTask>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            architecture:      ArchitectureKind::ScalarPrediction,
            train_data:        PathBuf::from("data/train"),
            test_data:         Vec::new(),
            out_dir:           PathBuf::from("runs/latest"),
            recurrent:         RecurrentKind::Gru,
            input_size:        2,
            size_hidden:       15,
            input_length:      None,
            digits_min:        -10,
            digits_max:        10,
            operators:         vec!["+".to_string(), "-".to_string()],
            dropout_recurrent: 0.0,
            mask_zero:         true,
            batch_size:        24,
            epochs:            100,
            learning_rate:     1e-3,
            optimizer:         OptimizerKind::Adam,
            validation_split:  0.1,
            seed:              42,
            log_every:         10,
            fix_embeddings:    false,
            fix_recurrent:     false,
            fix_classifier:    false,
            pretrain:          None,
            pretrain_epochs:   100,
            copy_weights:      WeightGroup::ALL.to_vec(),
            tasks:             vec![DiagnosticTask::Grammatical],
        }
    }
}

impl ExperimentConfig {
    pub fn dmap(&self) -> Dmap {
        Dmap::new(self.digits_min..=self.digits_max, &self.operators)
    }

    pub fn fit_options(&self, epochs: usize) -> FitOptions {
        FitOptions {
            epochs,
            batch_size:    self.batch_size,
            learning_rate: self.learning_rate,
            optimizer:     self.optimizer,
            seed:          self.seed,
            log_every:     self.log_every,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<ExperimentReport> {
        let cfg = &self.config;
        if cfg.architecture == ArchitectureKind::DiagnosticClassifier && cfg.pretrain.is_none() {
            anyhow::bail!("a diagnostic classifier needs a pretrained model: pass --pretrain");
        }
        experiment::run::<B>(cfg, device)
    }
}
