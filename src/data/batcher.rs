// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implement Burn's Batcher trait for the three sample shapes.
//
//   Input:  Vec of N samples, every sequence of length S
//   Output: Int id tensors [N, S] plus the matching targets
//
// All sequences are padded before they reach a batcher, so the
// flatten-then-reshape below never has ragged rows.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{ComparisonSample, ScalarSample, SequenceSample};

// ─── Batch types ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ScalarBatch<B: Backend> {
    /// [batch, seq_len]
    pub inputs:  Tensor<B, 2, Int>,
    /// [batch, 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Debug, Clone)]
pub struct ComparisonBatch<B: Backend> {
    pub left:   Tensor<B, 2, Int>,
    pub right:  Tensor<B, 2, Int>,
    /// [batch] class indices
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// [batch, seq_len]
    pub inputs:  Tensor<B, 2, Int>,
    /// one [batch, seq_len] tensor per head
    pub targets: Vec<Tensor<B, 2>>,
}

/// Stack equally long id rows into an Int tensor [rows, len].
pub fn ids_tensor<B: Backend>(rows: &[&[u32]], device: &B::Device) -> Tensor<B, 2, Int> {
    let len = rows.first().map_or(0, |r| r.len());
    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&x| x as i32))
        .collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), len])
}

fn floats_tensor<B: Backend>(rows: &[&[f32]], device: &B::Device) -> Tensor<B, 2> {
    let len = rows.first().map_or(0, |r| r.len());
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows.len(), len])
}

// ─── Batchers ─────────────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct ScalarBatcher;

impl<B: Backend> Batcher<B, ScalarSample, ScalarBatch<B>> for ScalarBatcher {
    fn batch(&self, items: Vec<ScalarSample>, device: &B::Device) -> ScalarBatch<B> {
        let rows: Vec<&[u32]> = items.iter().map(|s| s.input.as_slice()).collect();
        let targets: Vec<f32> = items.iter().map(|s| s.target).collect();

        ScalarBatch {
            inputs:  ids_tensor(&rows, device),
            targets: Tensor::<B, 1>::from_floats(targets.as_slice(), device)
                .reshape([items.len(), 1]),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ComparisonBatcher;

impl<B: Backend> Batcher<B, ComparisonSample, ComparisonBatch<B>> for ComparisonBatcher {
    fn batch(&self, items: Vec<ComparisonSample>, device: &B::Device) -> ComparisonBatch<B> {
        let left: Vec<&[u32]> = items.iter().map(|s| s.left.as_slice()).collect();
        let right: Vec<&[u32]> = items.iter().map(|s| s.right.as_slice()).collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        ComparisonBatch {
            left:   ids_tensor(&left, device),
            right:  ids_tensor(&right, device),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SequenceBatcher;

impl<B: Backend> Batcher<B, SequenceSample, SequenceBatch<B>> for SequenceBatcher {
    fn batch(&self, items: Vec<SequenceSample>, device: &B::Device) -> SequenceBatch<B> {
        let rows: Vec<&[u32]> = items.iter().map(|s| s.input.as_slice()).collect();
        let heads = items.first().map_or(0, |s| s.targets.len());

        let targets = (0..heads)
            .map(|h| {
                let head_rows: Vec<&[f32]> = items.iter().map(|s| s.targets[h].as_slice()).collect();
                floats_tensor(&head_rows, device)
            })
            .collect();

        SequenceBatch { inputs: ids_tensor(&rows, device), targets }
    }
}

/// Passes samples through untouched; the architectures batch them
/// into tensors themselves. Lets the training loader shuffle any sample type.
#[derive(Clone, Debug, Default)]
pub struct SampleBatcher;

impl<B: Backend, S: Clone + Send + Sync> Batcher<B, S, Vec<S>> for SampleBatcher {
    fn batch(&self, items: Vec<S>, _device: &B::Device) -> Vec<S> {
        items
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_scalar_batch_shapes() {
        let device = Default::default();
        let items = vec![
            ScalarSample { input: vec![0, 0, 14], target: 3.0 },
            ScalarSample { input: vec![24, 12, 25], target: 1.0 },
        ];
        let batch: ScalarBatch<B> = ScalarBatcher.batch(items, &device);
        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 1]);
        let ids: Vec<i64> = batch.inputs.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(ids, vec![0, 0, 14, 24, 12, 25]);
    }

    #[test]
    fn test_sequence_batch_has_one_target_per_head() {
        let device = Default::default();
        let items = vec![SequenceSample {
            input:   vec![0, 24, 12, 25],
            targets: vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 1.0, 1.0, 0.0]],
        }];
        let batch: SequenceBatch<B> = SequenceBatcher.batch(items, &device);
        assert_eq!(batch.targets.len(), 2);
        assert_eq!(batch.targets[1].dims(), [1, 4]);
    }

    #[test]
    fn test_comparison_batch_labels() {
        let device = Default::default();
        let items = vec![
            ComparisonSample { left: vec![12], right: vec![13], label: 0 },
            ComparisonSample { left: vec![13], right: vec![12], label: 2 },
        ];
        let batch: ComparisonBatch<B> = ComparisonBatcher.batch(items, &device);
        let labels: Vec<i64> = batch.labels.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![0, 2]);
    }
}
