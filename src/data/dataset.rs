use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One expression and its value. `input` is already padded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarSample {
    pub input:  Vec<u32>,
    pub target: f32,
}

/// Two expressions and how their values compare:
/// 0 → left < right, 1 → equal, 2 → left > right.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSample {
    pub left:  Vec<u32>,
    pub right: Vec<u32>,
    pub label: usize,
}

impl ComparisonSample {
    pub const CLASSES: usize = 3;

    pub fn label_for(ordering: Ordering) -> usize {
        match ordering {
            Ordering::Less    => 0,
            Ordering::Equal   => 1,
            Ordering::Greater => 2,
        }
    }
}

/// An expression with one padded target sequence per output head,
/// aligned token by token with `input`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSample {
    pub input:   Vec<u32>,
    pub targets: Vec<Vec<f32>>,
}

/// In-memory collection of samples, exposed through Burn's Dataset trait.
pub struct SampleSet<S> {
    samples: Vec<S>,
}

impl<S> SampleSet<S> {
    pub fn new(samples: Vec<S>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn as_slice(&self) -> &[S] { &self.samples }

    pub fn into_inner(self) -> Vec<S> { self.samples }
}

impl<S: Clone + Send + Sync> Dataset<S> for SampleSet<S> {
    fn get(&self, index: usize) -> Option<S> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_labels() {
        assert_eq!(ComparisonSample::label_for(Ordering::Less), 0);
        assert_eq!(ComparisonSample::label_for(Ordering::Equal), 1);
        assert_eq!(ComparisonSample::label_for(Ordering::Greater), 2);
    }

    #[test]
    fn test_dataset_access() {
        let set = SampleSet::new(vec![
            ScalarSample { input: vec![0, 11], target: 0.0 },
            ScalarSample { input: vec![24, 12], target: 1.0 },
        ]);
        assert_eq!(Dataset::len(&set), 2);
        assert_eq!(set.get(1).unwrap().target, 1.0);
        assert!(set.get(2).is_none());
    }
}
