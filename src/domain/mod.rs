// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the experiment's vocabulary:
//
//   vocab.rs      — the dmap: symbols ↔ integer ids
//   expression.rs — parsed arithmetic expressions, their values
//                   and per-token targets
//   task.rs       — diagnostic tasks a probe can be trained on
//   traits.rs     — shared abstractions over expression sources
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//
// Reference: Hupkes, Veldhoen & Zuidema (2018)
//            "Visualisation and 'diagnostic classifiers' reveal how
//             recurrent and recursive neural networks process
//             hierarchical structure"

/// Symbol ↔ id map used to encode expressions
pub mod vocab;

/// Expression parsing, evaluation and per-token targets
pub mod expression;

/// Diagnostic classifier tasks
pub mod task;

/// Core abstractions other layers implement
pub mod traits;
