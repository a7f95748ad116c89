// ============================================================
// Layer 5 — Training Architectures
// ============================================================
// Each architecture wraps the shared Encoder with its own heads
// and objective:
//
//   ScalarPrediction      ids → final state → dense(1)       MSE
//   ComparisonTraining    ids, ids → [h₁; h₂] → dense(3)     cross-entropy
//   Seq2Seq               ids → every state → dense(1)       masked MSE
//   DiagnosticClassifier  frozen encoder → one dense(1) per task
//
// The Architecture trait is what the trainer sees: a sample type,
// a batched loss, and access to the layers that can be reused by
// another architecture.

use burn::{nn::Linear, prelude::*};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ml::{encoder::Encoder, objective::BatchOutput};

pub mod comparison;
pub mod diagnostic;
pub mod scalar;
pub mod seq2seq;

pub use comparison::{ComparisonTraining, ComparisonTrainingConfig};
pub use diagnostic::{DiagnosticClassifier, DiagnosticClassifierConfig};
pub use scalar::{ScalarPrediction, ScalarPredictionConfig};
pub use seq2seq::{Seq2Seq, Seq2SeqConfig};

/// Name of the single head of the scalar, comparison and seq2seq architectures.
pub const OUTPUT_HEAD: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ArchitectureKind {
    #[value(name = "scalar")]
    ScalarPrediction,
    #[value(name = "comparison")]
    ComparisonTraining,
    #[value(name = "seq2seq")]
    Seq2Seq,
    #[value(name = "diagnostic")]
    DiagnosticClassifier,
}

impl fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchitectureKind::ScalarPrediction     => "ScalarPrediction",
            ArchitectureKind::ComparisonTraining   => "ComparisonTraining",
            ArchitectureKind::Seq2Seq              => "Seq2Seq",
            ArchitectureKind::DiagnosticClassifier => "DiagnosticClassifier",
        };
        f.write_str(name)
    }
}

pub trait Architecture<B: Backend>: Module<B> {
    type Sample: Clone + Send + Sync + 'static;

    fn kind(&self) -> ArchitectureKind;

    /// Forward a batch of samples and compute its loss and metric sums.
    fn forward_loss(&self, samples: Vec<Self::Sample>, device: &B::Device) -> BatchOutput<B>;

    fn encoder(&self) -> &Encoder<B>;

    /// Named dense heads, in a stable order.
    fn heads(&self) -> Vec<(String, Linear<B>)>;
}

/// [d_input, d_output] of a dense layer.
pub fn linear_shape<B: Backend>(linear: &Linear<B>) -> [usize; 2] {
    linear.weight.val().dims()
}
