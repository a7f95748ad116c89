// ============================================================
// Layer 2 — Experiment Runner
// ============================================================
// Shared workflow behind `train` and `probe`. A run has one or
// two stages:
//
//   "pretrain"  (optional) trains cfg.pretrain from scratch
//   "main"      trains cfg.architecture, seeded with the weight
//               groups selected from the pretrain stage
//
// Each stage encodes the expressions for its architecture,
// splits off the validation tail, fits, evaluates on every test
// file and writes its artefacts through the RunStore.

use anyhow::{bail, Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use std::fmt::Debug;

use crate::application::train_use_case::ExperimentConfig;
use crate::data::{
    dataset::SampleSet,
    encode::{comparison_samples, scalar_samples, sequence_samples},
    loader::ExpressionLoader,
    splitter::{shuffle_seeded, split_validation},
};
use crate::domain::{expression::Expression, traits::ExpressionSource, vocab::Dmap};
use crate::infra::{metrics::TrainingHistory, run_store::RunStore};
use crate::ml::{
    architectures::{
        seq2seq, Architecture, ArchitectureKind, ComparisonTrainingConfig, DiagnosticClassifier,
        ScalarPredictionConfig, Seq2SeqConfig,
    },
    encoder::EncoderConfig,
    evaluator::{test, Evaluation},
    trainer::{fit, FitOptions},
    transplant::{Pretrained, Transplant},
};

/// History and test results of one stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage:        String,
    pub architecture: ArchitectureKind,
    pub history:      TrainingHistory,
    pub evaluation:   Evaluation,
}

#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub stages: Vec<StageReport>,
}

impl ExperimentReport {
    /// Report of the last stage trained.
    pub fn main(&self) -> Option<&StageReport> {
        self.stages.last()
    }
}

/// Parsed expressions of a run.
pub struct ExperimentData {
    pub train: Vec<Expression>,
    pub tests: Vec<(String, Vec<Expression>)>,
}

impl ExperimentData {
    /// Load and shuffle the training expressions, load every test file,
    /// and refuse digits the dmap cannot encode.
    pub fn load(cfg: &ExperimentConfig, dmap: &Dmap) -> Result<Self> {
        let mut train = ExpressionLoader::new(&cfg.train_data).load_all()?;
        if train.is_empty() {
            bail!("no expressions in '{}'", cfg.train_data.display());
        }
        shuffle_seeded(&mut train, cfg.seed);
        check_digits(&train, dmap).with_context(|| format!("in '{}'", cfg.train_data.display()))?;

        let mut tests = Vec::with_capacity(cfg.test_data.len());
        for path in &cfg.test_data {
            let loader = ExpressionLoader::new(path);
            let expressions = loader.load_all()?;
            check_digits(&expressions, dmap).with_context(|| format!("in '{}'", path.display()))?;
            tests.push((loader.name(), expressions));
        }

        Ok(Self { train, tests })
    }

    /// Longest expression over train and test data.
    pub fn max_length(&self) -> usize {
        self.train
            .iter()
            .chain(self.tests.iter().flat_map(|(_, e)| e))
            .map(Expression::len)
            .max()
            .unwrap_or(0)
    }
}

fn check_digits(expressions: &[Expression], dmap: &Dmap) -> Result<()> {
    for e in expressions {
        if let Some((lo, hi)) = e.digit_range() {
            if !dmap.covers_digits(lo..=hi) {
                bail!("Model cannot process inputted digits: '{}' uses digits {}..={}", e, lo, hi);
            }
        }
    }
    Ok(())
}

/// Run every stage of `cfg` on backend `B`.
pub fn run<B: AutodiffBackend>(cfg: &ExperimentConfig, device: &B::Device) -> Result<ExperimentReport> {
    let dmap = cfg.dmap();
    tracing::info!("Dmap: {} symbols, input dimension {}", dmap.len(), dmap.input_dim());

    let data = ExperimentData::load(cfg, &dmap)?;
    tracing::info!(
        "{} training expressions, {} test sets",
        data.train.len(),
        data.tests.len()
    );

    let store = RunStore::new(&cfg.out_dir)?;
    store.save_config(cfg)?;
    store.save_dmap(&dmap)?;

    let mut stages = Vec::new();
    let mut pretrained = None;

    if let Some(kind) = cfg.pretrain {
        if kind == ArchitectureKind::DiagnosticClassifier {
            bail!("a diagnostic classifier cannot be used for pretraining");
        }
        let input_length = cfg.input_length.unwrap_or(data.max_length());
        let stage = Stage { name: "pretrain", kind, epochs: cfg.pretrain_epochs, input_length };
        let (report, model) = stage.run::<B>(cfg, &dmap, &data, None, &store, device)?;
        stages.push(report);
        pretrained = Some(model);
    }

    let input_length = cfg
        .input_length
        .or(pretrained.as_ref().map(|p| p.input_length))
        .unwrap_or(data.max_length());
    let stage = Stage { name: "main", kind: cfg.architecture, epochs: cfg.epochs, input_length };
    let (report, _) = stage.run::<B>(cfg, &dmap, &data, pretrained.as_ref(), &store, device)?;
    stages.push(report);

    tracing::info!("Run artefacts written to '{}'", store.dir().display());
    Ok(ExperimentReport { stages })
}

struct Stage {
    name:         &'static str,
    kind:         ArchitectureKind,
    epochs:       usize,
    input_length: usize,
}

impl Stage {
    fn run<B: AutodiffBackend>(
        &self,
        cfg:        &ExperimentConfig,
        dmap:       &Dmap,
        data:       &ExperimentData,
        pretrained: Option<&Pretrained<B>>,
        store:      &RunStore,
        device:     &B::Device,
    ) -> Result<(StageReport, Pretrained<B>)> {
        tracing::info!("── Stage '{}': {} ──", self.name, self.kind);

        let encoder = EncoderConfig::new(dmap.input_dim(), cfg.input_size, cfg.size_hidden, cfg.recurrent)
            .with_dropout_recurrent(cfg.dropout_recurrent)
            .with_mask_zero(cfg.mask_zero);
        let transplant = match pretrained {
            Some(p) if self.kind != ArchitectureKind::DiagnosticClassifier => {
                p.select(&cfg.copy_weights, dmap)?
            }
            _ => Transplant::none(),
        };
        let pad_to = Some(self.input_length);

        match self.kind {
            ArchitectureKind::ScalarPrediction => {
                let config = ScalarPredictionConfig::new(encoder)
                    .with_fix_embeddings(cfg.fix_embeddings)
                    .with_fix_recurrent(cfg.fix_recurrent)
                    .with_fix_classifier(cfg.fix_classifier);
                store.save_architecture(self.name, &config)?;
                let model = config.init_with::<B>(transplant, device)?;

                let train = scalar_samples(&data.train, dmap, pad_to)?.samples;
                let tests = data
                    .tests
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), scalar_samples(e, dmap, pad_to)?.samples)))
                    .collect::<Result<Vec<_>>>()?;
                self.train(cfg, dmap, model, train, tests, store, device)
            }
            ArchitectureKind::ComparisonTraining => {
                let config = ComparisonTrainingConfig::new(encoder)
                    .with_fix_embeddings(cfg.fix_embeddings)
                    .with_fix_recurrent(cfg.fix_recurrent)
                    .with_fix_classifier(cfg.fix_classifier);
                store.save_architecture(self.name, &config)?;
                let model = config.init_with::<B>(transplant, device)?;

                let train = comparison_samples(&data.train, dmap, pad_to, cfg.seed)?.samples;
                let tests = data
                    .tests
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), comparison_samples(e, dmap, pad_to, cfg.seed)?.samples)))
                    .collect::<Result<Vec<_>>>()?;
                self.train(cfg, dmap, model, train, tests, store, device)
            }
            ArchitectureKind::Seq2Seq => {
                if cfg.fix_embeddings || cfg.fix_recurrent {
                    tracing::warn!("Seq2Seq always trains its embedding and recurrent layer; ignoring fix flags");
                }
                let config = Seq2SeqConfig::new(encoder).with_fix_classifier(cfg.fix_classifier);
                store.save_architecture(self.name, &config)?;
                let model = config.init_with::<B>(transplant, device)?;

                let targets = [seq2seq::TARGET];
                let train = sequence_samples(&data.train, dmap, pad_to, &targets)?.samples;
                let tests = data
                    .tests
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), sequence_samples(e, dmap, pad_to, &targets)?.samples)))
                    .collect::<Result<Vec<_>>>()?;
                self.train(cfg, dmap, model, train, tests, store, device)
            }
            ArchitectureKind::DiagnosticClassifier => {
                let Some(pretrained) = pretrained else {
                    bail!("a diagnostic classifier needs a pretrained model");
                };
                let model = DiagnosticClassifier::from_pretrained(pretrained, &cfg.tasks, dmap, device)?;
                store.save_architecture(self.name, &model.config())?;

                let tasks = model.tasks();
                let train = sequence_samples(&data.train, dmap, pad_to, &tasks)?.samples;
                let tests = data
                    .tests
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), sequence_samples(e, dmap, pad_to, &tasks)?.samples)))
                    .collect::<Result<Vec<_>>>()?;
                self.train(cfg, dmap, model, train, tests, store, device)
            }
        }
    }

    /// Split, fit, evaluate and store one model.
    #[allow(clippy::too_many_arguments)]
    fn train<B, M>(
        &self,
        cfg:     &ExperimentConfig,
        dmap:    &Dmap,
        model:   M,
        samples: Vec<M::Sample>,
        tests:   Vec<(String, Vec<M::Sample>)>,
        store:   &RunStore,
        device:  &B::Device,
    ) -> Result<(StageReport, Pretrained<B>)>
    where
        B: AutodiffBackend,
        M: Architecture<B> + AutodiffModule<B>,
        M::Sample: Debug,
        M::InnerModule: Architecture<B::InnerBackend, Sample = M::Sample>,
    {
        let (train, validation) = split_validation(samples, cfg.validation_split);
        tracing::info!("Split: {} train, {} validation", train.len(), validation.len());

        let options: FitOptions = cfg.fit_options(self.epochs);
        let logger = store.metrics_logger(self.name)?;
        let (model, history) = fit(model, SampleSet::new(train), &validation, &options, Some(&logger), device)?;
        tracing::info!("{}", history.summary());
        store.save_history(self.name, &history)?;

        let evaluation = test(&model.valid(), &tests, cfg.batch_size, device);
        if !evaluation.is_empty() {
            tracing::info!("Test results:\n{}", evaluation);
        }
        store.save_evaluation(self.name, &evaluation)?;

        let report = StageReport {
            stage:        self.name.to_string(),
            architecture: self.kind,
            history,
            evaluation,
        };
        Ok((report, Pretrained::capture(&model, dmap, self.input_length)))
    }
}
