// ============================================================
// Layer 3 — Diagnostic Tasks
// ============================================================
// A diagnostic classifier is a small head trained on the frozen
// hidden states of a recurrent encoder. Each task names a
// per-token property of the input expression; how well a head
// can predict it tells us whether the hidden state encodes it.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a head turns its pre-activation into a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    Sigmoid,
}

/// Training objective of a head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    MeanSquaredError,
    BinaryCrossEntropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticTask {
    /// 1 once the prefix read so far is a complete expression
    #[value(name = "grammatical")]
    Grammatical,
    /// running result under the cumulative strategy
    #[value(name = "intermediate_locally")]
    IntermediateLocally,
    /// running result under the recursive strategy
    #[value(name = "intermediate_recursively")]
    IntermediateRecursively,
    /// 1 while the cumulative sign is negative
    #[value(name = "subtracting")]
    Subtracting,
    #[value(name = "minus1depth")]
    #[serde(rename = "minus1depth")]
    Minus1Depth,
    #[value(name = "minus2depth")]
    #[serde(rename = "minus2depth")]
    Minus2Depth,
    #[value(name = "minus3depth")]
    #[serde(rename = "minus3depth")]
    Minus3Depth,
    #[value(name = "minus4depth")]
    #[serde(rename = "minus4depth")]
    Minus4Depth,
    /// bracket depth
    #[value(name = "depth")]
    Depth,
}

impl DiagnosticTask {
    pub const ALL: [DiagnosticTask; 9] = [
        DiagnosticTask::Grammatical,
        DiagnosticTask::IntermediateLocally,
        DiagnosticTask::IntermediateRecursively,
        DiagnosticTask::Subtracting,
        DiagnosticTask::Minus1Depth,
        DiagnosticTask::Minus2Depth,
        DiagnosticTask::Minus3Depth,
        DiagnosticTask::Minus4Depth,
        DiagnosticTask::Depth,
    ];

    /// Name used for the head and its metrics.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticTask::Grammatical             => "grammatical",
            DiagnosticTask::IntermediateLocally     => "intermediate_locally",
            DiagnosticTask::IntermediateRecursively => "intermediate_recursively",
            DiagnosticTask::Subtracting             => "subtracting",
            DiagnosticTask::Minus1Depth             => "minus1depth",
            DiagnosticTask::Minus2Depth             => "minus2depth",
            DiagnosticTask::Minus3Depth             => "minus3depth",
            DiagnosticTask::Minus4Depth             => "minus4depth",
            DiagnosticTask::Depth                   => "depth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Position in `ALL`; stored inside modules, which can only hold plain data.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&t| t == self).unwrap_or_default()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            DiagnosticTask::Grammatical
                | DiagnosticTask::Subtracting
                | DiagnosticTask::Minus1Depth
                | DiagnosticTask::Minus2Depth
                | DiagnosticTask::Minus3Depth
                | DiagnosticTask::Minus4Depth
        )
    }

    pub fn output_size(self) -> usize {
        1
    }

    pub fn activation(self) -> Activation {
        if self.is_binary() { Activation::Sigmoid } else { Activation::Linear }
    }

    pub fn objective(self) -> Objective {
        if self.is_binary() { Objective::BinaryCrossEntropy } else { Objective::MeanSquaredError }
    }

    /// Metrics reported for this task's head.
    pub fn metrics(self) -> &'static [&'static str] {
        match self {
            DiagnosticTask::Depth => &["mean_squared_error", "binary_accuracy"],
            t if t.is_binary() => &["binary_accuracy"],
            _ => &["mean_absolute_error", "mean_squared_error", "binary_accuracy"],
        }
    }
}

impl fmt::Display for DiagnosticTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for task in DiagnosticTask::ALL {
            assert_eq!(DiagnosticTask::from_name(task.name()), Some(task));
        }
        assert_eq!(DiagnosticTask::from_name("intermediate_directly"), None);
    }

    #[test]
    fn test_objectives_follow_activation() {
        assert_eq!(DiagnosticTask::Subtracting.objective(), Objective::BinaryCrossEntropy);
        assert_eq!(DiagnosticTask::Subtracting.activation(), Activation::Sigmoid);
        assert_eq!(DiagnosticTask::Depth.objective(), Objective::MeanSquaredError);
        assert_eq!(DiagnosticTask::IntermediateLocally.activation(), Activation::Linear);
        assert_eq!(DiagnosticTask::Depth.metrics(), &["mean_squared_error", "binary_accuracy"]);
    }
}
