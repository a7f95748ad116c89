// ScalarPrediction: read an expression, predict its value.
//
//   ids [batch, len] → Encoder → final state [batch, h] → output dense(1)

use burn::{
    data::dataloader::batcher::Batcher,
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::{batcher::ScalarBatcher, dataset::ScalarSample};
use crate::infra::metrics::MetricTotals;
use crate::ml::architectures::{Architecture, ArchitectureKind, OUTPUT_HEAD};
use crate::ml::encoder::{Encoder, EncoderConfig};
use crate::ml::objective::{regression_metrics, scalar_value, BatchOutput};
use crate::ml::transplant::{ArchitectureError, Transplant};

pub const METRICS: [&str; 3] = ["mean_absolute_error", "mean_squared_error", "binary_accuracy"];

#[derive(Config, Debug)]
pub struct ScalarPredictionConfig {
    pub encoder: EncoderConfig,
    #[config(default = false)]
    pub fix_embeddings: bool,
    #[config(default = false)]
    pub fix_recurrent:  bool,
    #[config(default = false)]
    pub fix_classifier: bool,
}

impl ScalarPredictionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ScalarPrediction<B> {
        let encoder = self.encoder.init(device);
        let output = LinearConfig::new(self.encoder.size_hidden, 1).init(device);
        self.assemble(encoder, output)
    }

    /// Build the model around transplanted weights.
    pub fn init_with<B: Backend>(
        &self,
        mut transplant: Transplant<B>,
        device: &B::Device,
    ) -> Result<ScalarPrediction<B>, ArchitectureError> {
        let encoder = transplant.encoder(&self.encoder, device)?;
        let output = match transplant.head(OUTPUT_HEAD, [self.encoder.size_hidden, 1])? {
            Some(head) => head,
            None => LinearConfig::new(self.encoder.size_hidden, 1).init(device),
        };
        Ok(self.assemble(encoder, output))
    }

    fn assemble<B: Backend>(&self, encoder: Encoder<B>, output: Linear<B>) -> ScalarPrediction<B> {
        let encoder = encoder.freeze(self.fix_embeddings, self.fix_recurrent);
        let output = if self.fix_classifier { output.no_grad() } else { output };
        ScalarPrediction { encoder, output }
    }
}

#[derive(Module, Debug)]
pub struct ScalarPrediction<B: Backend> {
    pub encoder: Encoder<B>,
    pub output:  Linear<B>,
}

impl<B: Backend> ScalarPrediction<B> {
    /// ids [batch, len] → predicted values [batch, 1]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.output.forward(self.encoder.final_state(ids))
    }
}

impl<B: Backend> Architecture<B> for ScalarPrediction<B> {
    type Sample = ScalarSample;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::ScalarPrediction
    }

    fn forward_loss(&self, samples: Vec<ScalarSample>, device: &B::Device) -> BatchOutput<B> {
        let batch = ScalarBatcher.batch(samples, device);
        let [n, _] = batch.inputs.dims();

        let pred = self.forward(batch.inputs);
        let loss = MseLoss::new().forward(pred.clone(), batch.targets.clone(), Reduction::Mean);

        let mut metrics = MetricTotals::default();
        metrics.add("loss", scalar_value(loss.clone()) * n as f64, n as f64);
        let mask = Tensor::ones([n, 1], device);
        regression_metrics(&mut metrics, "", pred, batch.targets, mask, &METRICS);

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

    fn config() -> ScalarPredictionConfig {
        ScalarPredictionConfig::new(EncoderConfig::new(26, 2, 6, RecurrentKind::SimpleRnn))
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: ScalarPrediction<B> = config().init(&device);
        let ids = Tensor::<B, 1, Int>::from_ints([0, 0, 14, 24, 12, 22, 13, 25], &device).reshape([2, 4]);
        assert_eq!(model.forward(ids).dims(), [2, 1]);
    }

    #[test]
    fn test_loss_and_metrics_reported() {
        let device = Default::default();
        let model: ScalarPrediction<B> = config().init(&device);
        let samples = vec![
            ScalarSample { input: vec![0, 0, 14], target: 3.0 },
            ScalarSample { input: vec![24, 12, 25], target: 1.0 },
        ];
        let out = model.forward_loss(samples, &device);
        let avg = out.metrics.averages();
        for name in ["loss", "mean_absolute_error", "mean_squared_error", "binary_accuracy"] {
            assert!(avg.contains_key(name), "missing {name}");
        }
        assert!((avg["loss"] - avg["mean_squared_error"]).abs() < 1e-4);
        assert_eq!(model.heads()[0].0, "output");
    }
}
