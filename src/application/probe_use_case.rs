// ============================================================
// Layer 2 — ProbeUseCase
// ============================================================
// Train a base architecture, then train diagnostic classifiers
// on its frozen hidden states:
//
//   Step 1: Train the base model (scalar / comparison / seq2seq)
//   Step 2: Freeze its embedding + recurrent layer
//   Step 3: Train one head per task on the hidden states
//   Step 4: Evaluate every head on the test sets

use anyhow::{bail, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::application::{
    experiment::{self, ExperimentReport},
    train_use_case::ExperimentConfig,
};
use crate::ml::architectures::ArchitectureKind;

pub struct ProbeUseCase {
    config: ExperimentConfig,
}

impl ProbeUseCase {
    /// `base` is the architecture whose representations are probed.
    pub fn new(base: ArchitectureKind, mut config: ExperimentConfig) -> Self {
        config.pretrain = Some(base);
        config.architecture = ArchitectureKind::DiagnosticClassifier;
        Self { config }
    }

    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<ExperimentReport> {
        let cfg = &self.config;
        if cfg.pretrain == Some(ArchitectureKind::DiagnosticClassifier) {
            bail!("cannot probe a diagnostic classifier");
        }
        if cfg.tasks.is_empty() {
            bail!("no diagnostic tasks selected");
        }
        tracing::info!(
            "Probing {} for: {}",
            cfg.pretrain.map_or("-".to_string(), |k| k.to_string()),
            cfg.tasks.iter().map(|t| t.name()).collect::<Vec<_>>().join(", "),
        );
        experiment::run::<B>(cfg, device)
    }
}
