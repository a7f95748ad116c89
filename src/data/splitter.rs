// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Holds out the LAST `validation_split` fraction of the samples
// for validation. The samples arrive shuffled from the loader,
// so the tail is a random subset; taking it without a second
// shuffle keeps the split reproducible for a given seed.
//
// Split ratio: 90% training, 10% validation (configurable)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Split `samples` into (train, validation), validation being the tail.
pub fn split_validation<T>(mut samples: Vec<T>, validation_split: f64) -> (Vec<T>, Vec<T>) {
    let total     = samples.len();
    let n_val     = ((total as f64) * validation_split.clamp(0.0, 1.0)).round() as usize;
    let split_at  = total - n_val.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}

/// Seeded Fisher-Yates shuffle.
pub fn shuffle_seeded<T>(items: &mut [T], seed: u64) {
    items.shuffle(&mut StdRng::seed_from_u64(seed));
}
