// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One loop for every architecture, driven by the Architecture
// trait:
//
//   for each epoch:
//     shuffle (seeded) → minibatches → forward_loss → backward
//       → optimizer step
//     model.valid() → evaluate on the validation samples
//     record train / validation averages in the history + CSV
//
// Key Burn 0.20 insight:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend, which
//     also switches dropout off
//   - Frozen parameters (no_grad) get no gradients, so the
//     optimizer leaves them untouched

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{
        AdaGradConfig, AdamConfig, GradientsParams, Optimizer, RmsPropConfig, SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::data::{batcher::SampleBatcher, dataset::SampleSet};
use crate::infra::metrics::{format_metrics, EpochMetrics, MetricMap, MetricTotals, MetricsLogger, TrainingHistory};
use crate::ml::architectures::Architecture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    Adagrad,
    Sgd,
    #[value(name = "rmsprop")]
    #[serde(rename = "rmsprop")]
    RmsProp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    pub optimizer:     OptimizerKind,
    pub seed:          u64,
    /// Log a progress line every n epochs (0 = only the last one)
    pub log_every:     usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs:        100,
            batch_size:    24,
            learning_rate: 1e-3,
            optimizer:     OptimizerKind::Adam,
            seed:          42,
            log_every:     10,
        }
    }
}

/// Train `model` and return it together with the per-epoch metrics.
pub fn fit<B, M>(
    model:      M,
    train:      SampleSet<M::Sample>,
    validation: &[M::Sample],
    options:    &FitOptions,
    logger:     Option<&MetricsLogger>,
    device:     &B::Device,
) -> Result<(M, TrainingHistory)>
where
    B: AutodiffBackend,
    M: Architecture<B> + AutodiffModule<B>,
    M::Sample: Debug,
    M::InnerModule: Architecture<B::InnerBackend, Sample = M::Sample>,
{
    if options.batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    if train.sample_count() == 0 {
        bail!("no training samples");
    }

    tracing::info!(
        "Training {} on {} samples ({} validation) for {} epochs with {:?}",
        model.kind(),
        train.sample_count(),
        validation.len(),
        options.epochs,
        options.optimizer,
    );

    match options.optimizer {
        OptimizerKind::Adam    => run(model, AdamConfig::new().init(), train, validation, options, logger, device),
        OptimizerKind::Adagrad => run(model, AdaGradConfig::new().init(), train, validation, options, logger, device),
        OptimizerKind::Sgd     => run(model, SgdConfig::new().init(), train, validation, options, logger, device),
        OptimizerKind::RmsProp => run(model, RmsPropConfig::new().init(), train, validation, options, logger, device),
    }
}

fn run<B, M, O>(
    mut model:  M,
    mut optim:  O,
    train:      SampleSet<M::Sample>,
    validation: &[M::Sample],
    options:    &FitOptions,
    logger:     Option<&MetricsLogger>,
    device:     &B::Device,
) -> Result<(M, TrainingHistory)>
where
    B: AutodiffBackend,
    M: Architecture<B> + AutodiffModule<B>,
    M::Sample: Debug,
    M::InnerModule: Architecture<B::InnerBackend, Sample = M::Sample>,
    O: Optimizer<M, B>,
{
    let train_loader = DataLoaderBuilder::<B, M::Sample, Vec<M::Sample>>::new(SampleBatcher)
        .batch_size(options.batch_size)
        .shuffle(options.seed)
        .num_workers(1)
        .build(train);

    let mut history = TrainingHistory::default();

    for epoch in 1..=options.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut totals = MetricTotals::default();
        for samples in train_loader.iter() {
            let output = model.forward_loss(samples, device);
            totals.merge(output.metrics);

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(options.learning_rate, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let validation_metrics = if validation.is_empty() {
            None
        } else {
            Some(evaluate(&model.valid(), validation, options.batch_size, device))
        };

        let metrics = EpochMetrics { epoch, train: totals.averages(), validation: validation_metrics };

        let report = options.log_every > 0 && epoch % options.log_every == 0;
        if report || epoch == options.epochs {
            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={}",
                epoch,
                options.epochs,
                metrics.train_loss(),
                metrics.val_loss().map_or("-".to_string(), |v| format!("{v:.4}")),
            );
        }
        tracing::debug!("Epoch {} train: {}", epoch, format_metrics(&metrics.train));

        if let Some(logger) = logger {
            logger.log(&metrics)?;
        }
        history.record(metrics);
    }

    if let Some((epoch, loss)) = history.best_val_loss() {
        tracing::info!("Best validation loss {:.4} at epoch {}", loss, epoch);
    }
    tracing::info!("Training complete!");
    Ok((model, history))
}

/// Averaged metrics of `model` over `samples`, in order, `batch_size` at a time.
/// Sums are weighted per sample, or per token for per-step heads.
pub fn evaluate<B, M>(model: &M, samples: &[M::Sample], batch_size: usize, device: &B::Device) -> MetricMap
where
    B: Backend,
    M: Architecture<B>,
{
    let mut totals = MetricTotals::default();
    for chunk in samples.chunks(batch_size.max(1)) {
        totals.merge(model.forward_loss(chunk.to_vec(), device).metrics);
    }
    totals.averages()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{ScalarSample, SequenceSample};
    use crate::ml::architectures::{ScalarPrediction, ScalarPredictionConfig, Seq2Seq, Seq2SeqConfig};
    use crate::ml::encoder::EncoderConfig;
    use crate::ml::recurrent::RecurrentKind;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray>;

    fn samples() -> Vec<ScalarSample> {
        (0..8)
            .map(|i| ScalarSample { input: vec![0, 12 + (i % 3) as u32], target: 3.0 })
            .collect()
    }

    fn model(device: &<B as Backend>::Device) -> ScalarPrediction<B> {
        ScalarPredictionConfig::new(EncoderConfig::new(26, 2, 4, RecurrentKind::SimpleRnn)).init(device)
    }

    #[test]
    fn test_fit_records_every_epoch() {
        let device = Default::default();
        let options = FitOptions { epochs: 30, batch_size: 4, learning_rate: 0.05, ..FitOptions::default() };
        let validation = samples();

        let (_, history) = fit(model(&device), SampleSet::new(samples()), &validation, &options, None, &device)
            .unwrap();

        assert_eq!(history.epochs.len(), 30);
        assert_eq!(history.val_losses().len(), 30);
        let losses = history.losses();
        assert!(losses.iter().all(|l| l.is_finite()));
        assert!(losses[29] < losses[0], "loss did not decrease: {losses:?}");
    }

    #[test]
    fn test_every_optimizer_runs() {
        let device = Default::default();
        for optimizer in [OptimizerKind::Adam, OptimizerKind::Adagrad, OptimizerKind::Sgd, OptimizerKind::RmsProp] {
            let options = FitOptions { epochs: 1, batch_size: 3, optimizer, ..FitOptions::default() };
            let (_, history) = fit(model(&device), SampleSet::new(samples()), &[], &options, None, &device)
                .unwrap();
            assert!(history.epochs[0].validation.is_none());
        }
    }

    #[test]
    fn test_fit_writes_csv() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), "metrics.csv").unwrap();
        let options = FitOptions { epochs: 2, batch_size: 8, ..FitOptions::default() };

        fit(model(&device), SampleSet::new(samples()), &samples(), &options, Some(&logger), &device).unwrap();

        let csv = std::fs::read_to_string(logger.csv_path()).unwrap();
        assert!(csv.contains("2,validation,loss,"));
        assert!(csv.contains("1,train,mean_absolute_error,"));
    }

    #[test]
    fn test_refuses_empty_training_set() {
        let device = Default::default();
        let result = fit(model(&device), SampleSet::new(Vec::new()), &[], &FitOptions::default(), None, &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluate_is_sample_weighted() {
        let device = Default::default();
        let model = model(&device).valid();
        let all = samples();
        let whole = evaluate(&model, &all, 8, &device);
        let split = evaluate(&model, &all, 3, &device);
        assert!((whole["mean_squared_error"] - split["mean_squared_error"]).abs() < 1e-4);
    }

    #[test]
    fn test_per_step_loss_is_token_weighted() {
        let device = Default::default();
        let model: Seq2Seq<NdArray> =
            Seq2SeqConfig::new(EncoderConfig::new(26, 2, 4, RecurrentKind::Gru)).init(&device);

        // one real token against five
        let samples = vec![
            SequenceSample { input: vec![0, 0, 0, 0, 14], targets: vec![vec![0.0, 0.0, 0.0, 0.0, 9.0]] },
            SequenceSample { input: vec![24, 12, 22, 13, 25], targets: vec![vec![0.0, 1.0, 1.0, 2.0, 2.0]] },
        ];
        let together = evaluate(&model, &samples, 2, &device);
        let one_by_one = evaluate(&model, &samples, 1, &device);

        assert!((together["loss"] - one_by_one["loss"]).abs() < 1e-4);
        assert!((together["loss"] - together["mean_squared_error"]).abs() < 1e-4);
    }
}
