// ============================================================
// Layer 3 — Dmap (vocabulary)
// ============================================================
// Maps every symbol an expression can contain to an integer id:
//
//   digits (ascending)  →  1 ..= n_digits
//   operators           →  next ids, in the given order
//   "(" and ")"         →  the last two ids
//
// Id 0 is never assigned: it is the padding value, and the
// embedding layer masks it out of the recurrence.
//
// Changing the order of this map between training and testing
// silently scrambles every input, so two runs can only share
// weights when their maps compare equal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Id reserved for padding positions.
pub const PAD_ID: u32 = 0;

/// Errors raised while turning token strings into id sequences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("symbol '{0}' is not in the dmap")]
    UnknownSymbol(String),

    #[error("sequence of length {length} exceeds the padding length {max}; sequences are never truncated")]
    WouldTruncate { length: usize, max: usize },
}

/// Ordered symbol ↔ id map. Ids start at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Dmap {
    symbols: Vec<String>,
    ids:     HashMap<String, u32>,
}

impl Dmap {
    /// Build the map for the given digit range and operator list.
    pub fn new(digits: RangeInclusive<i64>, operators: &[String]) -> Self {
        let symbols: Vec<String> = digits
            .map(|d| d.to_string())
            .chain(operators.iter().cloned())
            .chain(["(".to_string(), ")".to_string()])
            .collect();
        Self::from(symbols)
    }

    /// Number of symbols (padding excluded).
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Rows of the embedding table: every symbol plus the padding id.
    pub fn input_dim(&self) -> usize {
        self.symbols.len() + 1
    }

    pub fn id(&self, symbol: &str) -> Option<u32> {
        self.ids.get(symbol).copied()
    }

    pub fn symbol(&self, id: u32) -> Option<&str> {
        if id == PAD_ID {
            return None;
        }
        self.symbols.get(id as usize - 1).map(String::as_str)
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// True if every digit in `digits` has an id.
    pub fn covers_digits(&self, digits: RangeInclusive<i64>) -> bool {
        digits.into_iter().all(|d| self.ids.contains_key(&d.to_string()))
    }

    /// Encode a token sequence.
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<u32>, EncodingError> {
        tokens
            .iter()
            .map(|t| {
                let t = t.as_ref();
                self.id(t).ok_or_else(|| EncodingError::UnknownSymbol(t.to_string()))
            })
            .collect()
    }

    /// Decode ids back to symbols, skipping padding.
    pub fn decode(&self, ids: &[u32]) -> Vec<&str> {
        ids.iter().filter_map(|&id| self.symbol(id)).collect()
    }
}

impl Default for Dmap {
    fn default() -> Self {
        Self::new(-10..=10, &["+".to_string(), "-".to_string()])
    }
}

impl PartialEq for Dmap {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

impl Eq for Dmap {}

impl From<Vec<String>> for Dmap {
    fn from(symbols: Vec<String>) -> Self {
        let ids = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32 + 1))
            .collect();
        Self { symbols, ids }
    }
}

impl From<Dmap> for Vec<String> {
    fn from(dmap: Dmap) -> Self {
        dmap.symbols
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let dmap = Dmap::default();
        assert_eq!(dmap.len(), 25);
        assert_eq!(dmap.input_dim(), 26);
        assert_eq!(dmap.id("-10"), Some(1));
        assert_eq!(dmap.id("0"), Some(11));
        assert_eq!(dmap.id("10"), Some(21));
        assert_eq!(dmap.id("+"), Some(22));
        assert_eq!(dmap.id("-"), Some(23));
        assert_eq!(dmap.id("("), Some(24));
        assert_eq!(dmap.id(")"), Some(25));
    }

    #[test]
    fn test_mapping_is_a_bijection() {
        let dmap = Dmap::default();
        let mut seen = std::collections::HashSet::new();
        for symbol in dmap.symbols() {
            let id = dmap.id(symbol).unwrap();
            assert_ne!(id, PAD_ID);
            assert!(seen.insert(id), "id {id} assigned twice");
            assert_eq!(dmap.symbol(id), Some(symbol.as_str()));
        }
        assert_eq!(seen.len(), dmap.len());
        assert_eq!(dmap.symbol(PAD_ID), None);
        assert_eq!(dmap.symbol(dmap.input_dim() as u32), None);
    }

    #[test]
    fn test_encode_and_decode() {
        let dmap = Dmap::default();
        let ids = dmap.encode(&["(", "3", "-", "-2", ")"]).unwrap();
        assert_eq!(ids, vec![24, 14, 23, 9, 25]);
        assert_eq!(dmap.decode(&[0, 0, 24, 14, 23, 9, 25]), vec!["(", "3", "-", "-2", ")"]);
    }

    #[test]
    fn test_unknown_symbol() {
        let dmap = Dmap::default();
        let err = dmap.encode(&["(", "11", ")"]).unwrap_err();
        assert_eq!(err, EncodingError::UnknownSymbol("11".to_string()));
    }

    #[test]
    fn test_covers_digits() {
        let dmap = Dmap::new(-5..=5, &["+".to_string(), "-".to_string()]);
        assert!(dmap.covers_digits(-3..=3));
        assert!(!dmap.covers_digits(-10..=10));
    }

    #[test]
    fn test_equality_and_serde() {
        let a = Dmap::default();
        let json = serde_json::to_string(&a).unwrap();
        let b: Dmap = serde_json::from_str(&json).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.id("("), Some(24));
        assert_ne!(a, Dmap::new(-5..=5, &["+".to_string(), "-".to_string()]));
    }
}
