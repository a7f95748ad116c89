// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   metrics.rs    — Training metrics
//                   Weighted batch sums, per-epoch history,
//                   and a CSV logger for later analysis.
//
//   run_store.rs  — Experiment artefacts
//                   Writes the experiment configuration, the
//                   dmap, model architectures and evaluation
//                   results as JSON into the output directory.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Training metrics CSV logger and history
pub mod metrics;

/// JSON artefacts of a run
pub mod run_store;
