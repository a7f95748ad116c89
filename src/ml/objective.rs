// ============================================================
// Layer 5 — Losses and Batch Metrics
// ============================================================
// Loss functions the architectures train with, and the metric
// sums they report per batch. Per-token variants take a
// [batch, len] mask so padded positions count for nothing.
//
//   mean_absolute_error  = mean |ŷ − y|
//   mean_squared_error   = mean (ŷ − y)²
//   binary_accuracy      = mean [round(ŷ) == y]     (regression heads)
//                        = mean [(p ≥ 0.5) == y]     (sigmoid heads)
//   categorical_accuracy = mean [argmax(ŷ) == y]

use burn::{prelude::*, tensor::activation};

use crate::infra::metrics::MetricTotals;

/// Loss to back-propagate plus the metric sums of the batch.
pub struct BatchOutput<B: Backend> {
    pub loss:    Tensor<B, 1>,
    pub metrics: MetricTotals,
}

pub fn scalar_value<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}

/// Masked mean squared error over [batch, len] predictions.
pub fn masked_mse<B: Backend>(pred: Tensor<B, 2>, target: Tensor<B, 2>, mask: Tensor<B, 2>) -> Tensor<B, 1> {
    let count = mask.clone().sum().clamp_min(1.0);
    ((pred - target).powf_scalar(2.0) * mask).sum().div(count)
}

/// Masked binary cross-entropy computed from logits.
pub fn masked_bce_with_logits<B: Backend>(
    logits: Tensor<B, 2>,
    target: Tensor<B, 2>,
    mask:   Tensor<B, 2>,
) -> Tensor<B, 1> {
    let count = mask.clone().sum().clamp_min(1.0);
    let positive = activation::log_sigmoid(logits.clone()) * target.clone();
    let negative = activation::log_sigmoid(logits.neg()) * target.mul_scalar(-1.0).add_scalar(1.0);
    ((positive + negative) * mask).sum().neg().div(count)
}

/// mae / mse / binary_accuracy sums for a regression head.
pub fn regression_metrics<B: Backend, const D: usize>(
    totals: &mut MetricTotals,
    prefix: &str,
    pred:   Tensor<B, D>,
    target: Tensor<B, D>,
    mask:   Tensor<B, D>,
    names:  &[&str],
) {
    let weight = scalar_value(mask.clone().sum());
    let error = pred.clone() - target.clone();

    for &name in names {
        let sum = match name {
            "mean_absolute_error" => error.clone().abs().mul(mask.clone()).sum(),
            "mean_squared_error"  => error.clone().powf_scalar(2.0).mul(mask.clone()).sum(),
            "binary_accuracy"     => pred.clone().round().equal(target.clone()).float().mul(mask.clone()).sum(),
            _ => continue,
        };
        totals.add(format!("{prefix}{name}"), scalar_value(sum), weight);
    }
}

/// binary_accuracy sum for a sigmoid head given its logits.
pub fn binary_metrics<B: Backend>(
    totals: &mut MetricTotals,
    prefix: &str,
    logits: Tensor<B, 2>,
    target: Tensor<B, 2>,
    mask:   Tensor<B, 2>,
) {
    let weight = scalar_value(mask.clone().sum());
    let predicted = logits.greater_equal_elem(0.0).float();
    let correct = predicted.equal(target).float().mul(mask).sum();
    totals.add(format!("{prefix}binary_accuracy"), scalar_value(correct), weight);
}

/// categorical_accuracy sum for [batch, classes] logits.
pub fn categorical_metrics<B: Backend>(
    totals: &mut MetricTotals,
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
) {
    let [batch, _] = logits.dims();
    // argmax(1) returns [batch, 1]; flatten before comparing with labels [batch]
    let predicted = logits.argmax(1).reshape([batch]);
    let correct: i64 = predicted.equal(labels).int().sum().into_scalar().elem::<i64>();
    totals.add("categorical_accuracy", correct as f64, batch as f64);
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn t2(values: &[f32], rows: usize) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(values, &Default::default()).reshape([rows, values.len() / rows])
    }

    #[test]
    fn test_masked_mse_ignores_padding() {
        let pred = t2(&[100.0, 1.0, 2.0], 1);
        let target = t2(&[0.0, 0.0, 0.0], 1);
        let mask = t2(&[0.0, 1.0, 1.0], 1);
        let loss = scalar_value(masked_mse(pred, target, mask));
        assert!((loss - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_masked_bce() {
        let logits = t2(&[0.0, 0.0], 1);
        let target = t2(&[1.0, 0.0], 1);
        let mask = t2(&[1.0, 1.0], 1);
        let loss = scalar_value(masked_bce_with_logits(logits, target, mask));
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_regression_metrics() {
        let mut totals = MetricTotals::default();
        regression_metrics(
            &mut totals,
            "",
            t2(&[1.2, 2.0, 9.0], 3),
            t2(&[1.0, 3.0, 0.0], 3),
            t2(&[1.0, 1.0, 0.0], 3),
            &["mean_absolute_error", "binary_accuracy"],
        );
        let avg = totals.averages();
        assert!((avg["mean_absolute_error"] - 0.6).abs() < 1e-5);
        assert!((avg["binary_accuracy"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_categorical_accuracy() {
        let mut totals = MetricTotals::default();
        let logits = t2(&[3.0, 0.0, 0.0, 0.0, 0.0, 5.0], 2);
        let labels = Tensor::<B, 1, Int>::from_ints([0, 1], &Default::default());
        categorical_metrics(&mut totals, logits, labels);
        assert_eq!(totals.averages()["categorical_accuracy"], 0.5);
    }
}
