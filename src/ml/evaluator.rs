// Test-set evaluation: run a trained model over several named
// sample sets and keep the results in the order given.

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::infra::metrics::{format_metrics, MetricMap};
use crate::ml::{architectures::Architecture, trainer::evaluate};

/// Metrics per named test set, in evaluation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub results: Vec<(String, MetricMap)>,
}

impl Evaluation {
    pub fn get(&self, name: &str) -> Option<&MetricMap> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// One line per test set: `name:<TAB>metric: value<TAB>...`
impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, metrics)) in self.results.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{name}:\t{}", format_metrics(metrics))?;
        }
        Ok(())
    }
}

/// Evaluate `model` on every named set.
pub fn test<B, M>(
    model:      &M,
    sets:       &[(String, Vec<M::Sample>)],
    batch_size: usize,
    device:     &B::Device,
) -> Evaluation
where
    B: Backend,
    M: Architecture<B>,
{
    let results = sets
        .iter()
        .map(|(name, samples)| {
            let metrics = evaluate(model, samples, batch_size, device);
            tracing::info!("Evaluated '{}' ({} samples)", name, samples.len());
            (name.clone(), metrics)
        })
        .collect();
    Evaluation { results }
}

pub fn evaluation_string(evaluation: &Evaluation) -> String {
    evaluation.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ComparisonSample;
    use crate::ml::architectures::{ComparisonTraining, ComparisonTrainingConfig};
    use crate::ml::encoder::EncoderConfig;
    use crate::ml::recurrent::RecurrentKind;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_sets_keep_their_order() {
        let device = Default::default();
        let model: ComparisonTraining<B> =
            ComparisonTrainingConfig::new(EncoderConfig::new(26, 2, 3, RecurrentKind::Gru)).init(&device);
        let sample = ComparisonSample { left: vec![0, 12], right: vec![0, 14], label: 0 };
        let sets = vec![
            ("L9".to_string(), vec![sample.clone()]),
            ("L3".to_string(), vec![sample.clone(), sample]),
        ];

        let evaluation = test(&model, &sets, 2, &device);
        let names: Vec<&str> = evaluation.results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["L9", "L3"]);
        assert!(evaluation.get("L3").unwrap().contains_key("categorical_accuracy"));

        let text = evaluation_string(&evaluation);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("L9:\t"));
    }
}
