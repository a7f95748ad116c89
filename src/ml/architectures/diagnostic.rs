// DiagnosticClassifier: probe what a trained encoder has learned.
//
// The embedding and recurrent weights of a pretrained model are
// frozen; on top of the per-step hidden states sits one small
// dense(1) head per task. Heads that already exist in the
// pretrained model under a task's name are reused.
//
//   ids → frozen Encoder → states [batch, len, h] ─┬─ head(task₁) → [batch, len]
//                                                  ├─ head(task₂) → [batch, len]
//                                                  └─ ...
//
// Binary tasks train with sigmoid + binary cross-entropy, numeric
// ones with mean squared error; the total loss is the sum. Every
// metric is prefixed with its task name.

use burn::{
    data::dataloader::batcher::Batcher,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};

use crate::data::{batcher::SequenceBatcher, dataset::SequenceSample};
use crate::domain::{task::DiagnosticTask, vocab::Dmap};
use crate::infra::metrics::MetricTotals;
use crate::ml::architectures::{linear_shape, Architecture, ArchitectureKind};
use crate::ml::encoder::{Encoder, EncoderConfig};
use crate::ml::objective::{
    binary_metrics, masked_bce_with_logits, masked_mse, regression_metrics, scalar_value, BatchOutput,
};
use crate::ml::transplant::{ArchitectureError, Pretrained, WeightGroup};

/// Description of a diagnostic classifier. Built from a pretrained
/// encoder, never initialised on its own.
#[derive(Config, Debug)]
pub struct DiagnosticClassifierConfig {
    pub encoder: EncoderConfig,
    pub tasks:   Vec<DiagnosticTask>,
}

/// One per-step head and the task it predicts.
#[derive(Module, Debug)]
pub struct ProbeHead<B: Backend> {
    pub linear: Linear<B>,
    /// Index into `DiagnosticTask::ALL`
    pub task:   usize,
}

impl<B: Backend> ProbeHead<B> {
    pub fn task(&self) -> DiagnosticTask {
        DiagnosticTask::from_index(self.task).unwrap_or(DiagnosticTask::Grammatical)
    }
}

#[derive(Module, Debug)]
pub struct DiagnosticClassifier<B: Backend> {
    pub encoder: Encoder<B>,
    pub heads:   Vec<ProbeHead<B>>,
}

impl<B: Backend> DiagnosticClassifier<B> {
    /// Attach one head per task to the frozen encoder of `pretrained`.
    pub fn from_pretrained(
        pretrained: &Pretrained<B>,
        tasks:      &[DiagnosticTask],
        dmap:       &Dmap,
        device:     &B::Device,
    ) -> Result<Self, ArchitectureError> {
        if tasks.is_empty() {
            return Err(ArchitectureError::NoProbes);
        }

        let config = pretrained.encoder_config();
        let mut transplant = pretrained.select(&[WeightGroup::Embeddings, WeightGroup::Recurrent], dmap)?;
        let encoder = transplant.encoder(&config, device)?.freeze(true, true);

        let expected = [config.size_hidden, 1];
        let mut heads: Vec<ProbeHead<B>> = Vec::with_capacity(tasks.len());
        for &task in tasks {
            if heads.iter().any(|h| h.task == task.index()) {
                continue;
            }
            let linear = match pretrained.heads.get(task.name()) {
                Some(head) => {
                    let found = linear_shape(head);
                    if found != expected {
                        return Err(ArchitectureError::HeadShape {
                            head: task.name().to_string(),
                            expected,
                            found,
                        });
                    }
                    tracing::info!("Reusing pretrained head '{}'", task);
                    head.clone()
                }
                None => LinearConfig::new(config.size_hidden, 1).init(device),
            };
            heads.push(ProbeHead { linear, task: task.index() });
        }

        Ok(Self { encoder, heads })
    }

    /// Tasks in head order; sequence samples must carry their targets in this order.
    pub fn tasks(&self) -> Vec<DiagnosticTask> {
        self.heads.iter().map(ProbeHead::task).collect()
    }

    pub fn config(&self) -> DiagnosticClassifierConfig {
        DiagnosticClassifierConfig::new(self.encoder.config(), self.tasks())
    }

    /// Raw head outputs, one [batch, len] tensor per task.
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Vec<Tensor<B, 2>> {
        let [batch, len] = ids.dims();
        let states = self.encoder.hidden_states(ids);
        self.heads
            .iter()
            .map(|head| head.linear.forward(states.clone()).reshape([batch, len]))
            .collect()
    }

    /// Predictions with each task's activation applied.
    pub fn predict(&self, ids: Tensor<B, 2, Int>) -> Vec<(DiagnosticTask, Tensor<B, 2>)> {
        self.tasks()
            .into_iter()
            .zip(self.forward(ids))
            .map(|(task, out)| {
                let out = if task.is_binary() { activation::sigmoid(out) } else { out };
                (task, out)
            })
            .collect()
    }
}

impl<B: Backend> Architecture<B> for DiagnosticClassifier<B> {
    type Sample = SequenceSample;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::DiagnosticClassifier
    }

    fn forward_loss(&self, samples: Vec<SequenceSample>, device: &B::Device) -> BatchOutput<B> {
        let batch = SequenceBatcher.batch(samples, device);
        let mask = batch.inputs.clone().not_equal_elem(0).float();
        let tokens = scalar_value(mask.clone().sum());
        let outputs = self.forward(batch.inputs);

        let mut metrics = MetricTotals::default();
        let mut losses = Vec::with_capacity(outputs.len());

        for ((task, out), target) in self.tasks().into_iter().zip(outputs).zip(batch.targets) {
            let prefix = format!("{}_", task.name());
            let loss = if task.is_binary() {
                binary_metrics(&mut metrics, &prefix, out.clone(), target.clone(), mask.clone());
                masked_bce_with_logits(out, target, mask.clone())
            } else {
                regression_metrics(&mut metrics, &prefix, out.clone(), target.clone(), mask.clone(), task.metrics());
                masked_mse(out, target, mask.clone())
            };
            metrics.add(format!("{prefix}loss"), scalar_value(loss.clone()) * tokens, tokens);
            losses.push(loss);
        }

        let loss = Tensor::cat(losses, 0).sum();
        metrics.add("loss", scalar_value(loss.clone()) * tokens, tokens);

        BatchOutput { loss, metrics }
    }

    fn encoder(&self) -> &Encoder<B> {
        &self.encoder
    }

    fn heads(&self) -> Vec<(String, Linear<B>)> {
        self.heads
            .iter()
            .map(|head| (head.task().name().to_string(), head.linear.clone()))
            .collect()
    }
}
