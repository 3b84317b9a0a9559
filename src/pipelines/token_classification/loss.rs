use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use crate::models::LayerError;

/// Smallest probability fed to the logarithm
const EPSILON: f32 = 1e-8;

/// Categorical crossentropy over a list of per-item guesses and one-hot truths.
///
/// Returns the gradient of each guess, `(guess - truth) / total_rows`, and the mean loss over
/// all rows.
pub fn sequence_categorical_crossentropy<B: Backend>(
    guesses: &[Tensor<B, 2>],
    truths: &[Tensor<B, 2>],
) -> Result<(Vec<Tensor<B, 2>>, f32), LayerError> {
    if guesses.len() != truths.len() {
        return Err(LayerError::ShapeMismatch {
            expected: [guesses.len(), 0],
            actual: [truths.len(), 0],
        });
    }

    for (guess, truth) in guesses.iter().zip(truths) {
        if guess.dims() != truth.dims() {
            return Err(LayerError::ShapeMismatch {
                expected: guess.dims(),
                actual: truth.dims(),
            });
        }
    }

    let total: usize = guesses.iter().map(|g| g.dims()[0]).sum();
    if total == 0 {
        return Ok((guesses.to_vec(), 0.0));
    }

    let scale = 1.0 / total as f32;
    let mut loss = 0.0;

    let d_guesses = guesses
        .iter()
        .zip(truths)
        .map(|(guess, truth)| {
            if guess.dims()[0] > 0 {
                let item_loss: f32 = (truth.clone() * guess.clone().clamp_min(EPSILON).log())
                    .sum()
                    .into_scalar()
                    .elem();

                loss -= item_loss;
            }

            (guess.clone() - truth.clone()).mul_scalar(scale)
        })
        .collect();

    Ok((d_guesses, loss * scale))
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::{TensorData, Tolerance},
    };

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_gradient_and_loss() {
        let device = NdArrayDevice::Cpu;
        let guesses = vec![
            Tensor::<TestBackend, 2>::from_floats([[0.5, 0.5], [0.25, 0.75]], &device),
            Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device),
        ];
        let truths = vec![
            Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 1.0]], &device),
            Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device),
        ];

        let (d_guesses, loss) = sequence_categorical_crossentropy(&guesses, &truths).unwrap();

        d_guesses[0].to_data().assert_approx_eq::<f32>(
            &TensorData::from([[-0.5 / 3.0, 0.5 / 3.0], [0.25 / 3.0, -0.25 / 3.0]]),
            Tolerance::default(),
        );
        d_guesses[1]
            .to_data()
            .assert_approx_eq::<f32>(&TensorData::from([[0.0, 0.0]]), Tolerance::default());

        let expected = -(0.5f32.ln() + 0.75f32.ln()) / 3.0;
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn test_shape_mismatch() {
        let device = NdArrayDevice::Cpu;
        let guesses = vec![Tensor::<TestBackend, 2>::zeros([2, 3], &device)];
        let truths = vec![Tensor::<TestBackend, 2>::zeros([2, 4], &device)];

        let result = sequence_categorical_crossentropy(&guesses, &truths);

        assert!(matches!(result, Err(LayerError::ShapeMismatch { .. })));
    }
}
