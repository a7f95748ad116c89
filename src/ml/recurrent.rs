// ============================================================
// Layer 5 — Recurrent Layer
// ============================================================
// One recurrent layer of a configurable cell type:
//
//   srn   — simple recurrent network:  h' = tanh(W·x + U·h + b)
//   gru   — Burn's gated recurrent unit
//   lstm  — Burn's long short-term memory
//
// The layer is unrolled one time step at a time so that padded
// positions can be skipped. For every step t:
//
//   h_t = m_t · cell(x_t, h_{t-1}) + (1 − m_t) · h_{t-1}
//
// where m_t is 1 for a real token and 0 for padding. Because
// padding is placed in front of the sequence, a padded input
// reaches exactly the final state of the unpadded one.
//
// Recurrent dropout (when enabled) is applied to the previous
// hidden state before it enters the cell.
//
// For GRU layers the update (z) and reset (r) gate values of every
// step can be read out alongside the hidden states.

use burn::{
    nn::{
        Dropout, DropoutConfig,
        gru::{Gru, GruConfig},
        Linear, LinearConfig,
        Lstm, LstmConfig, LstmState,
    },
    prelude::*,
    tensor::activation,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ml::transplant::ArchitectureError;

/// Which recurrent cell to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum RecurrentKind {
    #[value(name = "srn")]
    SimpleRnn,
    #[value(name = "gru")]
    Gru,
    #[value(name = "lstm")]
    Lstm,
}

impl fmt::Display for RecurrentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecurrentKind::SimpleRnn => "SimpleRNN",
            RecurrentKind::Gru       => "GRU",
            RecurrentKind::Lstm      => "LSTM",
        };
        f.write_str(name)
    }
}

#[derive(Config, Debug)]
pub struct RecurrentConfig {
    pub kind:     RecurrentKind,
    pub d_input:  usize,
    pub d_hidden: usize,
    #[config(default = 0.0)]
    pub dropout:  f64,
}

impl RecurrentConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentLayer<B> {
        let (mut simple, mut gru, mut lstm) = (None, None, None);
        match self.kind {
            RecurrentKind::SimpleRnn => {
                simple = Some(SimpleRnn {
                    input:     LinearConfig::new(self.d_input, self.d_hidden).init(device),
                    recurrent: LinearConfig::new(self.d_hidden, self.d_hidden)
                        .with_bias(false)
                        .init(device),
                })
            }
            RecurrentKind::Gru => {
                gru = Some(GruConfig::new(self.d_input, self.d_hidden, true).init(device))
            }
            RecurrentKind::Lstm => {
                lstm = Some(LstmConfig::new(self.d_input, self.d_hidden, true).init(device))
            }
        }

        RecurrentLayer {
            simple, gru, lstm,
            dropout:  DropoutConfig::new(self.dropout).init(),
            d_input:  self.d_input,
            d_hidden: self.d_hidden,
        }
    }
}

/// Elman cell: tanh over an input map and a bias-free recurrent map.
#[derive(Module, Debug)]
pub struct SimpleRnn<B: Backend> {
    pub input:     Linear<B>,
    pub recurrent: Linear<B>,
}

impl<B: Backend> SimpleRnn<B> {
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        activation::tanh(self.input.forward(x) + self.recurrent.forward(h))
    }
}

/// Per-step activations of a GRU layer, each [batch, len, d_hidden].
/// Gate values are zero at padded steps.
#[derive(Debug, Clone)]
pub struct GateActivations<B: Backend> {
    pub hidden: Tensor<B, 3>,
    pub update: Tensor<B, 3>,
    pub reset:  Tensor<B, 3>,
}

/// Exactly one of `simple`, `gru`, `lstm` is set.
#[derive(Module, Debug)]
pub struct RecurrentLayer<B: Backend> {
    pub simple:   Option<SimpleRnn<B>>,
    pub gru:      Option<Gru<B>>,
    pub lstm:     Option<Lstm<B>>,
    pub dropout:  Dropout,
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl<B: Backend> RecurrentLayer<B> {
    pub fn kind(&self) -> RecurrentKind {
        if self.gru.is_some() {
            RecurrentKind::Gru
        } else if self.lstm.is_some() {
            RecurrentKind::Lstm
        } else {
            RecurrentKind::SimpleRnn
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.d_hidden
    }

    pub fn input_size(&self) -> usize {
        self.d_input
    }

    /// Replace the recurrent dropout probability.
    pub fn with_dropout(mut self, prob: f64) -> Self {
        self.dropout = DropoutConfig::new(prob).init();
        self
    }

    /// inputs: [batch, len, d_input], mask: [batch, len] (1 = token, 0 = padding)
    /// → hidden states [batch, len, d_hidden]
    pub fn forward(&self, inputs: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, len, d_input] = inputs.dims();
        let device = inputs.device();

        let mut hidden = Tensor::<B, 2>::zeros([batch, self.d_hidden], &device);
        let mut cell   = Tensor::<B, 2>::zeros([batch, self.d_hidden], &device);
        let mut states = Vec::with_capacity(len);

        for t in 0..len {
            let x_t = inputs.clone().slice([0..batch, t..t + 1, 0..d_input]);
            let h_in = self.dropout.forward(hidden.clone());
            let (h_next, c_next) = self.step(x_t, h_in, cell.clone());

            // carry the previous state through padded steps
            let keep = mask
                .clone()
                .slice([0..batch, t..t + 1])
                .repeat_dim(1, self.d_hidden);
            let skip = keep.clone().mul_scalar(-1.0).add_scalar(1.0);

            hidden = h_next * keep.clone() + hidden * skip.clone();
            cell   = c_next * keep + cell * skip;

            states.push(hidden.clone().reshape([batch, 1, self.d_hidden]));
        }

        Tensor::cat(states, 1)
    }

    /// Hidden states plus update and reset gate values for every step.
    /// Only GRU layers have gates to report.
    pub fn gate_activations(
        &self,
        inputs: Tensor<B, 3>,
        mask:   Tensor<B, 2>,
    ) -> Result<GateActivations<B>, ArchitectureError> {
        let Some(gru) = &self.gru else {
            return Err(ArchitectureError::GatesNeedGru(self.kind()));
        };
        let [batch, len, d_input] = inputs.dims();
        let device = inputs.device();

        let mut hidden = Tensor::<B, 2>::zeros([batch, self.d_hidden], &device);
        let mut states = Vec::with_capacity(len);
        let mut update = Vec::with_capacity(len);
        let mut reset  = Vec::with_capacity(len);

        for t in 0..len {
            let x_t = inputs.clone().slice([0..batch, t..t + 1, 0..d_input]);
            let x_flat = x_t.clone().reshape([batch, d_input]);
            let h_in = self.dropout.forward(hidden.clone());

            let z = activation::sigmoid(gru.update_gate.gate_product(x_flat.clone(), h_in.clone()));
            let r = activation::sigmoid(gru.reset_gate.gate_product(x_flat, h_in.clone()));
            let h_next = gru.forward(x_t, Some(h_in)).reshape([batch, self.d_hidden]);

            let keep = mask
                .clone()
                .slice([0..batch, t..t + 1])
                .repeat_dim(1, self.d_hidden);
            let skip = keep.clone().mul_scalar(-1.0).add_scalar(1.0);
            hidden = h_next * keep.clone() + hidden * skip;

            states.push(hidden.clone().reshape([batch, 1, self.d_hidden]));
            update.push((z * keep.clone()).reshape([batch, 1, self.d_hidden]));
            reset.push((r * keep).reshape([batch, 1, self.d_hidden]));
        }

        Ok(GateActivations {
            hidden: Tensor::cat(states, 1),
            update: Tensor::cat(update, 1),
            reset:  Tensor::cat(reset, 1),
        })
    }

    /// x: [batch, 1, d_input] → (hidden, cell), both [batch, d_hidden].
    /// The cell state is only meaningful for LSTMs and passes through otherwise.
    fn step(
        &self,
        x:      Tensor<B, 3>,
        hidden: Tensor<B, 2>,
        cell:   Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _, d_input] = x.dims();

        if let Some(gru) = &self.gru {
            let out = gru.forward(x, Some(hidden));
            return (out.reshape([batch, self.d_hidden]), cell);
        }
        if let Some(lstm) = &self.lstm {
            let (_, state) = lstm.forward(x, Some(LstmState::new(cell, hidden)));
            return (state.hidden, state.cell);
        }
        match &self.simple {
            Some(srn) => (srn.step(x.reshape([batch, d_input]), hidden), cell),
            None => (hidden, cell),
        }
    }
}
