// Seq2Seq: predict the running cumulative result after every token.
//
//   ids [batch, len] → Encoder → states [batch, len, h] → output dense(1) per step
//
// Padding positions are excluded from the loss. The embedding and
// the recurrent layer are always trained.

use burn::{
    data::dataloader::batcher::Batcher,
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::data::{batcher::SequenceBatcher, dataset::SequenceSample};
use crate::domain::task::DiagnosticTask;
use crate::infra::metrics::MetricTotals;
use crate::ml::architectures::{Architecture, ArchitectureKind, OUTPUT_HEAD};
use crate::ml::encoder::{Encoder, EncoderConfig};
use crate::ml::objective::{masked_mse, regression_metrics, scalar_value, BatchOutput};
use crate::ml::transplant::{ArchitectureError, Transplant};

/// The per-token target this architecture trains on.
pub const TARGET: DiagnosticTask = DiagnosticTask::IntermediateLocally;

#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub encoder: EncoderConfig,
    #[config(default = false)]
    pub fix_classifier: bool,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2Seq<B> {
        let encoder = self.encoder.init(device);
        let output = LinearConfig::new(self.encoder.size_hidden, 1).init(device);
        self.assemble(encoder, output)
    }

    pub fn init_with<B: Backend>(
        &self,
        mut transplant: Transplant<B>,
        device: &B::Device,
    ) -> Result<Seq2Seq<B>, ArchitectureError> {
        let encoder = transplant.encoder(&self.encoder, device)?;
        let output = match transplant.head(OUTPUT_HEAD, [self.encoder.size_hidden, 1])? {
            Some(head) => head,
            None => LinearConfig::new(self.encoder.size_hidden, 1).init(device),
        };
        Ok(self.assemble(encoder, output))
    }

    fn assemble<B: Backend>(&self, encoder: Encoder<B>, output: Linear<B>) -> Seq2Seq<B> {
        let output = if self.fix_classifier { output.no_grad() } else { output };
        Seq2Seq { encoder, output }
    }
}

#[derive(Module, Debug)]
pub struct Seq2Seq<B: Backend> {
    pub encoder: Encoder<B>,
    pub output:  Linear<B>,
}

impl<B: Backend> Seq2Seq<B> {
    /// ids [batch, len] → one prediction per token [batch, len]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, len] = ids.dims();
        self.output
            .forward(self.encoder.hidden_states(ids))
            .reshape([batch, len])
    }
}

impl<B: Backend> Architecture<B> for Seq2Seq<B> {
    type Sample = SequenceSample;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::Seq2Seq
    }

    fn forward_loss(&self, samples: Vec<SequenceSample>, device: &B::Device) -> BatchOutput<B> {
        let mut batch = SequenceBatcher.batch(samples, device);
        let mask = batch.inputs.clone().not_equal_elem(0).float();
        let tokens = scalar_value(mask.clone().sum());
        let target = batch.targets.swap_remove(0);

        let pred = self.forward(batch.inputs);
        let loss = masked_mse(pred.clone(), target.clone(), mask.clone());

        // token-weighted, like the per-step metrics
        let mut metrics = MetricTotals::default();
        metrics.add("loss", scalar_value(loss.clone()) * tokens, tokens);
        regression_metrics(&mut metrics, "", pred, target, mask, TARGET.metrics());

        BatchOutput { loss, metrics }
    }

    fn encoder(&self) -> &Encoder<B> {
        &self.encoder
    }

    fn heads(&self) -> Vec<(String, Linear<B>)> {
        vec![(OUTPUT_HEAD.to_string(), self.output.clone())]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::recurrent::RecurrentKind;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_one_prediction_per_token() {
        let device = Default::default();
        let cfg = Seq2SeqConfig::new(EncoderConfig::new(26, 2, 4, RecurrentKind::Gru));
        let model: Seq2Seq<B> = cfg.init(&device);
        let ids = Tensor::<B, 1, Int>::from_ints([0, 24, 12, 22, 13, 25], &device).reshape([1, 6]);
        assert_eq!(model.forward(ids).dims(), [1, 6]);
    }

    #[test]
    fn test_padding_is_not_scored() {
        let device = Default::default();
        let cfg = Seq2SeqConfig::new(EncoderConfig::new(26, 2, 4, RecurrentKind::SimpleRnn));
        let model: Seq2Seq<B> = cfg.init(&device);

        // targets on the padded positions are wildly off; they must not count
        let samples = vec![SequenceSample {
            input:   vec![0, 0, 14],
            targets: vec![vec![1000.0, -1000.0, 3.0]],
        }];
        let avg = model.forward_loss(samples, &device).metrics.averages();
        assert!(avg["mean_absolute_error"] < 100.0);
        assert!((avg["loss"] - avg["mean_squared_error"]).abs() < 1e-3);
    }
}
