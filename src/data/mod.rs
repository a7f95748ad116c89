// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From expression files to tensor batches:
//
//   expressions.txt
//       │
//       ▼
//   ExpressionLoader  → parses one expression per line
//       │
//       ▼
//   Dmap + encode     → integer ids and targets per architecture
//       │
//       ▼
//   padding           → pre-pads to a common length (never truncates)
//       │
//       ▼
//   SampleSet         → implements Burn's Dataset trait
//       │
//       ▼
//   *Batcher          → stacks samples into tensor batches
//
// Reference: Burn Book §4 (Datasets and Batchers)

/// Reads expression files
pub mod loader;

/// Pre-padding without truncation
pub mod padding;

/// Sample types and Burn Dataset implementation
pub mod dataset;

/// Per-architecture sample encoding
pub mod encode;

/// Burn Batcher implementations
pub mod batcher;

/// Validation split and seeded shuffling
pub mod splitter;
