use burn::tensor::{backend::Backend, ElementConversion};

use crate::models::Tagger;

use super::{Batcher, Item};

/// Fraction of words whose highest scoring tag is the true tag, predicted in minibatches
pub fn evaluate_sequences<B: Backend, I: Item>(
    model: &Tagger<B>,
    batcher: &Batcher<B>,
    items: &[I],
    batch_size: usize,
) -> anyhow::Result<f64> {
    let mut correct = 0usize;
    let mut total = 0usize;

    for chunk in items.chunks(batch_size.max(1)) {
        let batch = batcher.batch_train(chunk)?;
        let guesses = model.predict(batch.input)?;

        for (guess, truth) in guesses.into_iter().zip(batch.targets) {
            let [rows, _] = truth.dims();
            if rows == 0 {
                continue;
            }

            let matches: i64 = guess
                .argmax(1)
                .equal(truth.argmax(1))
                .int()
                .sum()
                .into_scalar()
                .elem();

            correct += matches as usize;
            total += rows;
        }
    }

    if total == 0 {
        return Ok(0.0);
    }

    Ok(correct as f64 / total as f64)
}
