// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for expressions through this
// trait and never sees where they come from:
//   - ExpressionLoader   → a text file, one expression per line
//   - Vec<Expression>    → expressions already in memory (tests)

use anyhow::Result;
use crate::domain::expression::Expression;

// ─── ExpressionSource ─────────────────────────────────────────────────────────
/// Any component that can provide a set of arithmetic expressions.
pub trait ExpressionSource {
    /// Load every available expression from this source.
    fn load_all(&self) -> Result<Vec<Expression>>;

    /// Human-readable name used in logs and evaluation reports.
    fn name(&self) -> String;
}

impl ExpressionSource for Vec<Expression> {
    fn load_all(&self) -> Result<Vec<Expression>> {
        Ok(self.clone())
    }

    fn name(&self) -> String {
        format!("{} in-memory expressions", self.len())
    }
}
