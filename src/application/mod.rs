// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training an architecture or probing one).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Shared stage logic: encode, fit, evaluate, store
pub mod experiment;

// The training workflow
pub mod train_use_case;

// Diagnostic classifiers on a trained model
pub mod probe_use_case;
