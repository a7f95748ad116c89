// ComparisonTraining: read two expressions with one shared encoder
// and classify how their values compare (<, =, >).
//
//   left  ─┐
//          ├─ Encoder (shared) → [h_left ; h_right] → output dense(3)
//   right ─┘

use burn::{
    data::dataloader::batcher::Batcher,
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::data::{batcher::ComparisonBatcher, dataset::ComparisonSample};
use crate::infra::metrics::MetricTotals;
use crate::ml::architectures::{Architecture, ArchitectureKind, OUTPUT_HEAD};
use crate::ml::encoder::{Encoder, EncoderConfig};
use crate::ml::objective::{categorical_metrics, scalar_value, BatchOutput};
use crate::ml::transplant::{ArchitectureError, Transplant};

#[derive(Config, Debug)]
pub struct ComparisonTrainingConfig {
    pub encoder: EncoderConfig,
    #[config(default = false)]
    pub fix_embeddings: bool,
    #[config(default = false)]
    pub fix_recurrent:  bool,
    #[config(default = false)]
    pub fix_classifier: bool,
}

impl ComparisonTrainingConfig {
    fn head_shape(&self) -> [usize; 2] {
        [2 * self.encoder.size_hidden, ComparisonSample::CLASSES]
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ComparisonTraining<B> {
        let [d_input, d_output] = self.head_shape();
        let encoder = self.encoder.init(device);
        let output = LinearConfig::new(d_input, d_output).init(device);
        self.assemble(encoder, output)
    }

    /// Build the model around transplanted weights. A copied head must emit
    /// exactly three classes.
    pub fn init_with<B: Backend>(
        &self,
        mut transplant: Transplant<B>,
        device: &B::Device,
    ) -> Result<ComparisonTraining<B>, ArchitectureError> {
        let [d_input, d_output] = self.head_shape();
        let encoder = transplant.encoder(&self.encoder, device)?;
        let output = match transplant.head(OUTPUT_HEAD, [d_input, d_output])? {
            Some(head) => head,
            None => LinearConfig::new(d_input, d_output).init(device),
        };
        Ok(self.assemble(encoder, output))
    }

    fn assemble<B: Backend>(&self, encoder: Encoder<B>, output: Linear<B>) -> ComparisonTraining<B> {
        let encoder = encoder.freeze(self.fix_embeddings, self.fix_recurrent);
        let output = if self.fix_classifier { output.no_grad() } else { output };
        ComparisonTraining { encoder, output }
    }
}

#[derive(Module, Debug)]
pub struct ComparisonTraining<B: Backend> {
    pub encoder: Encoder<B>,
    pub output:  Linear<B>,
}

impl<B: Backend> ComparisonTraining<B> {
    /// Two id tensors [batch, len] → class logits [batch, 3].
    /// Softmax is folded into the cross-entropy loss.
    pub fn forward(&self, left: Tensor<B, 2, Int>, right: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let h_left = self.encoder.final_state(left);
        let h_right = self.encoder.final_state(right);
        self.output.forward(Tensor::cat(vec![h_left, h_right], 1))
    }
}

impl<B: Backend> Architecture<B> for ComparisonTraining<B> {
    type Sample = ComparisonSample;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::ComparisonTraining
    }

    fn forward_loss(&self, samples: Vec<ComparisonSample>, device: &B::Device) -> BatchOutput<B> {
        let batch = ComparisonBatcher.batch(samples, device);
        let [n] = batch.labels.dims();

        let logits = self.forward(batch.left, batch.right);
        let loss = CrossEntropyLossConfig::new()
            .init(device)
            .forward(logits.clone(), batch.labels.clone());

        let mut metrics = MetricTotals::default();
        metrics.add("loss", scalar_value(loss.clone()) * n as f64, n as f64);
        categorical_metrics(&mut metrics, logits, batch.labels);

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
    fn test_forward_emits_three_classes() {
        let device = Default::default();
        let cfg = ComparisonTrainingConfig::new(EncoderConfig::new(26, 2, 5, RecurrentKind::Gru));
        let model: ComparisonTraining<B> = cfg.init(&device);
        let left = Tensor::<B, 1, Int>::from_ints([0, 0, 14], &device).reshape([1, 3]);
        let right = Tensor::<B, 1, Int>::from_ints([24, 12, 25], &device).reshape([1, 3]);
        assert_eq!(model.forward(left, right).dims(), [1, 3]);
    }

    #[test]
    fn test_loss_and_accuracy() {
        let device = Default::default();
        let cfg = ComparisonTrainingConfig::new(EncoderConfig::new(26, 2, 5, RecurrentKind::Lstm));
        let model: ComparisonTraining<B> = cfg.init(&device);
        let samples = vec![
            ComparisonSample { left: vec![0, 12], right: vec![0, 13], label: 0 },
            ComparisonSample { left: vec![0, 13], right: vec![0, 13], label: 1 },
        ];
        let avg = model.forward_loss(samples, &device).metrics.averages();
        assert!(avg["loss"] > 0.0);
        let acc = avg["categorical_accuracy"];
        assert!((0.0..=1.0).contains(&acc));
    }
}
