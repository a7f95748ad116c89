// ============================================================
// Layer 4 — Sequence Padding
// ============================================================
// Brings variable-length sequences to one common length by
// prepending the default value (0 for token ids):
//
//   [24, 14, 25]  → pad_to 5 →  [0, 0, 24, 14, 25]
//
// Padding goes in front so the last real token is always the
// last time step the recurrent layer sees.
//
// Sequences are NEVER truncated. Asking for a padding length
// shorter than some sequence is an error, because cutting tokens
// off an expression changes what it means.

use crate::domain::vocab::EncodingError;

/// Length every sequence will have after padding.
pub fn padded_length<T>(seqs: &[Vec<T>], pad_to: Option<usize>) -> Result<usize, EncodingError> {
    let longest = seqs.iter().map(Vec::len).max().unwrap_or(0);
    match pad_to {
        None => Ok(longest),
        Some(max) if longest > max => Err(EncodingError::WouldTruncate { length: longest, max }),
        Some(max) => Ok(max),
    }
}

/// Pre-pad a single sequence to `len`.
pub fn pad_one<T: Copy + Default>(seq: &[T], len: usize) -> Result<Vec<T>, EncodingError> {
    if seq.len() > len {
        return Err(EncodingError::WouldTruncate { length: seq.len(), max: len });
    }
    let mut padded = vec![T::default(); len - seq.len()];
    padded.extend_from_slice(seq);
    Ok(padded)
}

/// Pre-pad every sequence to `pad_to`, or to the longest one when `pad_to` is None.
pub fn pad_sequences<T: Copy + Default>(
    seqs:   &[Vec<T>],
    pad_to: Option<usize>,
) -> Result<Vec<Vec<T>>, EncodingError> {
    let len = padded_length(seqs, pad_to)?;
    seqs.iter().map(|s| pad_one(s, len)).collect()
}
