// ============================================================
// Layer 5 — Pretrained Weight Reuse
// ============================================================
// A model trained with one architecture can seed another: the
// embedding table, the recurrent layer and any head can be
// copied across, provided the shapes agree.
//
//   Pretrained::capture(model)   snapshot of a trained model
//        │
//        ▼
//   Pretrained::select(copy)     pick weight groups, check dmap
//        │
//        ▼
//   Transplant                   handed to an architecture's
//                                init_with(), which checks the
//                                heads it takes
//
// Loading refuses when:
//   - the pretrained embedding table does not match the dmap size
//   - the pretrained dmap differs from the target's dmap
//   - a copied head has the wrong shape (e.g. a comparison head
//     must emit exactly 3 classes, a scalar head exactly 1)
//   - a transplanted layer does not fit the target encoder

use burn::{
    nn::{Embedding, Linear},
    prelude::*,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::vocab::Dmap;
use crate::ml::architectures::{linear_shape, Architecture, ArchitectureKind};
use crate::ml::encoder::{Encoder, EncoderConfig};
use crate::ml::recurrent::{RecurrentKind, RecurrentLayer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchitectureError {
    #[error("dmap mismatch: pretrained model has input dimension {found}, the architecture expects {expected}")]
    InputDimMismatch { expected: usize, found: usize },

    #[error("pretrained model dmap is not identical to the architecture dmap")]
    DmapMismatch,

    #[error("head '{head}' has shape {found:?}, expected {expected:?}")]
    HeadShape { head: String, expected: [usize; 2], found: [usize; 2] },

    #[error("pretrained model has no head named '{0}'")]
    MissingHead(String),

    #[error("transplanted {layer} has shape {found:?}, expected {expected:?}")]
    LayerShape { layer: &'static str, expected: [usize; 2], found: [usize; 2] },

    #[error("a diagnostic classifier needs at least one task")]
    NoProbes,

    #[error("gate activations are only available for GRU layers, not {0}")]
    GatesNeedGru(RecurrentKind),
}

/// Groups of weights that can be copied from a pretrained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WeightGroup {
    Recurrent,
    Embeddings,
    Classifier,
}

impl WeightGroup {
    pub const ALL: [WeightGroup; 3] = [WeightGroup::Recurrent, WeightGroup::Embeddings, WeightGroup::Classifier];
}

/// Snapshot of a trained model.
#[derive(Debug, Clone)]
pub struct Pretrained<B: Backend> {
    pub architecture: ArchitectureKind,
    pub dmap:         Dmap,
    pub input_length: usize,
    pub encoder:      Encoder<B>,
    pub heads:        BTreeMap<String, Linear<B>>,
}

impl<B: Backend> Pretrained<B> {
    pub fn capture<M: Architecture<B>>(model: &M, dmap: &Dmap, input_length: usize) -> Self {
        Self {
            architecture: model.kind(),
            dmap:         dmap.clone(),
            input_length,
            encoder:      model.encoder().clone(),
            heads:        model.heads().into_iter().collect(),
        }
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        self.encoder.config()
    }

    /// Pick the weight groups to copy into an architecture built for `dmap`.
    pub fn select(&self, copy: &[WeightGroup], dmap: &Dmap) -> Result<Transplant<B>, ArchitectureError> {
        let found = self.encoder.config().input_dim;
        if found != dmap.input_dim() {
            return Err(ArchitectureError::InputDimMismatch { expected: dmap.input_dim(), found });
        }
        if self.dmap != *dmap {
            return Err(ArchitectureError::DmapMismatch);
        }

        let mut transplant = Transplant::default();
        if copy.contains(&WeightGroup::Embeddings) {
            transplant.embedding = Some(self.encoder.embedding.clone());
        }
        if copy.contains(&WeightGroup::Recurrent) {
            transplant.recurrent = Some(self.encoder.recurrent.clone());
        }
        if copy.contains(&WeightGroup::Classifier) {
            transplant.heads = self.heads.clone();
            transplant.require_heads = true;
        }

        tracing::info!(
            "Reusing {:?} from pretrained {} ({} heads available)",
            copy,
            self.architecture,
            self.heads.len()
        );
        Ok(transplant)
    }
}

/// Weights selected for reuse. Empty groups are initialised fresh.
#[derive(Debug, Clone)]
pub struct Transplant<B: Backend> {
    pub embedding: Option<Embedding<B>>,
    pub recurrent: Option<RecurrentLayer<B>>,
    pub heads:     BTreeMap<String, Linear<B>>,
    /// Whether a missing head is an error (classifier weights were requested).
    pub require_heads: bool,
}

impl<B: Backend> Default for Transplant<B> {
    fn default() -> Self {
        Self { embedding: None, recurrent: None, heads: BTreeMap::new(), require_heads: false }
    }
}

impl<B: Backend> Transplant<B> {
    /// Nothing transplanted: everything is initialised fresh.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build the encoder, reusing transplanted layers after checking their shapes.
    pub fn encoder(&mut self, config: &EncoderConfig, device: &B::Device) -> Result<Encoder<B>, ArchitectureError> {
        let mut encoder = config.init::<B>(device);

        if let Some(embedding) = self.embedding.take() {
            let expected = [config.input_dim, config.input_size];
            let found = embedding.weight.val().dims();
            if found != expected {
                return Err(ArchitectureError::LayerShape { layer: "embedding", expected, found });
            }
            encoder.embedding = embedding;
        }

        if let Some(recurrent) = self.recurrent.take() {
            let expected = [config.input_size, config.size_hidden];
            let found = [recurrent.input_size(), recurrent.hidden_size()];
            if found != expected || recurrent.kind() != config.recurrent {
                return Err(ArchitectureError::LayerShape { layer: "recurrent layer", expected, found });
            }
            encoder.recurrent = recurrent.with_dropout(config.dropout_recurrent);
        }

        Ok(encoder)
    }

    /// Take the head called `name`, checking it has shape `expected`.
    /// A missing head is `None` unless classifier weights were requested.
    pub fn head(&mut self, name: &str, expected: [usize; 2]) -> Result<Option<Linear<B>>, ArchitectureError> {
        match self.heads.remove(name) {
            Some(head) => {
                let found = linear_shape(&head);
                if found != expected {
                    return Err(ArchitectureError::HeadShape { head: name.to_string(), expected, found });
                }
                Ok(Some(head))
            }
            None if self.require_heads => Err(ArchitectureError::MissingHead(name.to_string())),
            None => Ok(None),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::architectures::{
        ComparisonTraining, ComparisonTrainingConfig, ScalarPrediction, ScalarPredictionConfig, Seq2SeqConfig,
    };
    use burn::backend::NdArray;

    type B = NdArray;

    fn encoder_config(dmap: &Dmap) -> EncoderConfig {
        EncoderConfig::new(dmap.input_dim(), 2, 4, RecurrentKind::Gru)
    }

    fn trained_scalar(dmap: &Dmap) -> Pretrained<B> {
        let model: ScalarPrediction<B> = ScalarPredictionConfig::new(encoder_config(dmap)).init(&Default::default());
        Pretrained::capture(&model, dmap, 9)
    }

    #[test]
    fn test_capture_records_heads_and_shapes() {
        let dmap = Dmap::default();
        let pretrained = trained_scalar(&dmap);
        assert_eq!(pretrained.architecture, ArchitectureKind::ScalarPrediction);
        assert_eq!(pretrained.input_length, 9);
        assert!(pretrained.heads.contains_key("output"));
        let cfg = pretrained.encoder_config();
        assert_eq!((cfg.input_dim, cfg.input_size, cfg.size_hidden), (26, 2, 4));
    }

    #[test]
    fn test_comparison_refuses_scalar_classifier() {
        let dmap = Dmap::default();
        let transplant = trained_scalar(&dmap).select(&WeightGroup::ALL, &dmap).unwrap();
        let err = ComparisonTrainingConfig::new(encoder_config(&dmap))
            .init_with::<B>(transplant, &Default::default())
            .unwrap_err();
        assert_eq!(err, ArchitectureError::HeadShape {
            head:     "output".to_string(),
            expected: [8, 3],
            found:    [4, 1],
        });
    }

    #[test]
    fn test_scalar_refuses_comparison_classifier() {
        let dmap = Dmap::default();
        let model: ComparisonTraining<B> =
            ComparisonTrainingConfig::new(encoder_config(&dmap)).init(&Default::default());
        let transplant = Pretrained::capture(&model, &dmap, 9).select(&WeightGroup::ALL, &dmap).unwrap();
        let err = ScalarPredictionConfig::new(encoder_config(&dmap))
            .init_with::<B>(transplant, &Default::default())
            .unwrap_err();
        assert_eq!(err, ArchitectureError::HeadShape {
            head:     "output".to_string(),
            expected: [4, 1],
            found:    [8, 3],
        });
    }

    #[test]
    fn test_encoder_only_transplant_keeps_weights() {
        let dmap = Dmap::default();
        let pretrained = trained_scalar(&dmap);
        let transplant = pretrained
            .select(&[WeightGroup::Embeddings, WeightGroup::Recurrent], &dmap)
            .unwrap();
        let model = ComparisonTrainingConfig::new(encoder_config(&dmap))
            .init_with::<B>(transplant, &Default::default())
            .unwrap();

        let before: Vec<f32> = pretrained.encoder.embedding.weight.val().into_data().to_vec().unwrap();
        let after: Vec<f32> = model.encoder.embedding.weight.val().into_data().to_vec().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_scalar_head_fits_seq2seq() {
        let dmap = Dmap::default();
        let transplant = trained_scalar(&dmap).select(&[WeightGroup::Classifier], &dmap).unwrap();
        assert!(Seq2SeqConfig::new(encoder_config(&dmap)).init_with::<B>(transplant, &Default::default()).is_ok());
    }

    #[test]
    fn test_dmap_guards() {
        let dmap = Dmap::default();
        let pretrained = trained_scalar(&dmap);

        let smaller = Dmap::new(-5..=5, &["+".to_string(), "-".to_string()]);
        assert_eq!(
            pretrained.select(&WeightGroup::ALL, &smaller).unwrap_err(),
            ArchitectureError::InputDimMismatch { expected: 16, found: 26 },
        );

        let reordered = Dmap::new(-10..=10, &["-".to_string(), "+".to_string()]);
        assert_eq!(
            pretrained.select(&WeightGroup::ALL, &reordered).unwrap_err(),
            ArchitectureError::DmapMismatch,
        );
    }

    #[test]
    fn test_missing_head_when_classifier_requested() {
        let dmap = Dmap::default();
        let mut transplant = trained_scalar(&dmap).select(&[WeightGroup::Classifier], &dmap).unwrap();
        transplant.heads.clear();
        let err = ScalarPredictionConfig::new(encoder_config(&dmap))
            .init_with::<B>(transplant, &Default::default())
            .unwrap_err();
        assert_eq!(err, ArchitectureError::MissingHead("output".to_string()));
    }

    #[test]
    fn test_recurrent_shape_checked() {
        let dmap = Dmap::default();
        let transplant = trained_scalar(&dmap).select(&[WeightGroup::Recurrent], &dmap).unwrap();
        let wider = EncoderConfig::new(dmap.input_dim(), 2, 7, RecurrentKind::Gru);
        let err = ScalarPredictionConfig::new(wider)
            .init_with::<B>(transplant, &Default::default())
            .unwrap_err();
        assert!(matches!(err, ArchitectureError::LayerShape { layer: "recurrent layer", .. }));
    }
}
