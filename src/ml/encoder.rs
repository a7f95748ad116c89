// ============================================================
// Layer 5 — Expression Encoder
// ============================================================
// Embedding → recurrent layer. Every architecture in this crate
// shares this front end and differs only in the heads it puts on
// top of the hidden states.
//
//   ids [batch, len] ──embedding──▶ [batch, len, input_size]
//                    ──recurrent──▶ [batch, len, size_hidden]

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::ml::recurrent::{GateActivations, RecurrentConfig, RecurrentKind, RecurrentLayer};
use crate::ml::transplant::ArchitectureError;

#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Embedding rows: dmap size + 1 for padding
    pub input_dim:   usize,
    /// Embedding width, i.e. the recurrent layer's input size
    pub input_size:  usize,
    pub size_hidden: usize,
    pub recurrent:   RecurrentKind,
    #[config(default = 0.0)]
    pub dropout_recurrent: f64,
    /// Skip id 0 in the recurrence
    #[config(default = true)]
    pub mask_zero: bool,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let embedding = EmbeddingConfig::new(self.input_dim, self.input_size).init(device);
        let recurrent = RecurrentConfig::new(self.recurrent, self.input_size, self.size_hidden)
            .with_dropout(self.dropout_recurrent)
            .init(device);
        Encoder { embedding, recurrent, mask_zero: self.mask_zero }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub recurrent: RecurrentLayer<B>,
    pub mask_zero: bool,
}

impl<B: Backend> Encoder<B> {
    /// [batch, len] float mask, 1 where the recurrence should advance.
    pub fn mask(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        if self.mask_zero {
            ids.not_equal_elem(0).float()
        } else {
            let [batch, len] = ids.dims();
            Tensor::ones([batch, len], &ids.device())
        }
    }

    /// Hidden activations for every time step: [batch, len, size_hidden].
    pub fn hidden_states(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let mask = self.mask(ids.clone());
        let embedded = self.embedding.forward(ids);
        self.recurrent.forward(embedded, mask)
    }

    /// Hidden states with the update and reset gates of a GRU encoder.
    pub fn gate_activations(&self, ids: Tensor<B, 2, Int>) -> Result<GateActivations<B>, ArchitectureError> {
        let mask = self.mask(ids.clone());
        let embedded = self.embedding.forward(ids);
        self.recurrent.gate_activations(embedded, mask)
    }

    /// State after the last time step: [batch, size_hidden].
    pub fn final_state(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let states = self.hidden_states(ids);
        let [batch, len, hidden] = states.dims();
        states
            .slice([0..batch, len - 1..len, 0..hidden])
            .reshape([batch, hidden])
    }

    pub fn size_hidden(&self) -> usize {
        self.recurrent.hidden_size()
    }

    /// Stop gradient updates to the embedding and/or recurrent weights.
    pub fn freeze(mut self, embeddings: bool, recurrent: bool) -> Self {
        if embeddings {
            self.embedding = self.embedding.no_grad();
        }
        if recurrent {
            self.recurrent = self.recurrent.no_grad();
        }
        self
    }

    /// Rebuild the configuration from the module shapes.
    pub fn config(&self) -> EncoderConfig {
        let [input_dim, input_size] = self.embedding.weight.val().dims();
        EncoderConfig::new(input_dim, input_size, self.recurrent.hidden_size(), self.recurrent.kind())
            .with_dropout_recurrent(self.recurrent.dropout.prob)
            .with_mask_zero(self.mask_zero)
    }
}
