// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model code: layers, architectures,
// losses and the training loop. The data layer only touches Burn
// for its Dataset and Batcher traits.
//
// What's in this layer:
//
//   recurrent.rs      — SRN / GRU / LSTM layer with padding masks
//   encoder.rs        — embedding → recurrent layer
//   objective.rs      — masked losses and batch metric sums
//   architectures/    — scalar, comparison, seq2seq, diagnostic
//   transplant.rs     — reuse of pretrained weights, shape guards
//   trainer.rs        — fit loop and evaluation
//   evaluator.rs      — named test sets and their report
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Recurrent cells unrolled over padded sequences
pub mod recurrent;

/// Embedding + recurrent front end shared by every architecture
pub mod encoder;

pub mod objective;

/// Training architectures and the trait the trainer drives
pub mod architectures;

/// Pretrained weight reuse
pub mod transplant;

/// Training loop with validation and metric logging
pub mod trainer;

pub mod evaluator;
