// ============================================================
// Layer 4 — Sample Encoding
// ============================================================
// Turns parsed expressions into padded integer samples for each
// training architecture:
//
//   scalar      : ids            → value of the expression
//   comparison  : ids, ids       → <, = or > (partner expressions
//                                  are drawn by a seeded shuffle)
//   sequence    : ids            → one target per token per task
//
// Every architecture pads to the same length: the model's input
// length when one is known, otherwise the longest expression.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::{ComparisonSample, ScalarSample, SequenceSample};
use crate::data::padding::{pad_one, padded_length};
use crate::domain::{expression::Expression, task::DiagnosticTask, vocab::{Dmap, EncodingError}};

/// Encoded samples plus the length they were padded to.
#[derive(Debug, Clone)]
pub struct Encoded<S> {
    pub samples: Vec<S>,
    pub length:  usize,
}

fn encode_all(expressions: &[Expression], dmap: &Dmap) -> Result<Vec<Vec<u32>>, EncodingError> {
    expressions.iter().map(|e| dmap.encode(e.symbols())).collect()
}

pub fn scalar_samples(
    expressions: &[Expression],
    dmap:        &Dmap,
    pad_to:      Option<usize>,
) -> Result<Encoded<ScalarSample>, EncodingError> {
    let ids = encode_all(expressions, dmap)?;
    let length = padded_length(&ids, pad_to)?;

    let samples = ids
        .iter()
        .zip(expressions)
        .map(|(seq, e)| {
            Ok(ScalarSample { input: pad_one(seq, length)?, target: e.value() as f32 })
        })
        .collect::<Result<Vec<_>, EncodingError>>()?;

    Ok(Encoded { samples, length })
}

/// Pair every expression with a partner drawn by a seeded shuffle.
pub fn comparison_samples(
    expressions: &[Expression],
    dmap:        &Dmap,
    pad_to:      Option<usize>,
    seed:        u64,
) -> Result<Encoded<ComparisonSample>, EncodingError> {
    let ids = encode_all(expressions, dmap)?;
    let length = padded_length(&ids, pad_to)?;

    let mut partners: Vec<usize> = (0..expressions.len()).collect();
    partners.shuffle(&mut StdRng::seed_from_u64(seed));

    let samples = partners
        .iter()
        .enumerate()
        .map(|(i, &j)| {
            Ok(ComparisonSample {
                left:  pad_one(&ids[i], length)?,
                right: pad_one(&ids[j], length)?,
                label: ComparisonSample::label_for(expressions[i].compare(&expressions[j])),
            })
        })
        .collect::<Result<Vec<_>, EncodingError>>()?;

    Ok(Encoded { samples, length })
}

/// Per-token targets for each task, padded like the input.
pub fn sequence_samples(
    expressions: &[Expression],
    dmap:        &Dmap,
    pad_to:      Option<usize>,
    tasks:       &[DiagnosticTask],
) -> Result<Encoded<SequenceSample>, EncodingError> {
    let ids = encode_all(expressions, dmap)?;
    let length = padded_length(&ids, pad_to)?;

    let samples = ids
        .iter()
        .zip(expressions)
        .map(|(seq, e)| {
            let targets = tasks
                .iter()
                .map(|&task| pad_one(&e.targets(task), length))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SequenceSample { input: pad_one(seq, length)?, targets })
        })
        .collect::<Result<Vec<_>, EncodingError>>()?;

    Ok(Encoded { samples, length })
}
