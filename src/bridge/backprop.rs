use burn::tensor::{backend::AutodiffBackend, Tensor};
use derive_new::new;

use crate::utils::tensors;

use super::{restore_markers, BridgeError, Lengths, MARKERS};

/// Captures the encoder output and the lengths computed on the forward pass, so that
/// gradients for the trimmed items can later be pushed back through the encoder.
#[derive(Debug, new)]
pub struct Backprop<B: AutodiffBackend> {
    /// The autodiff-tracked `[batch_size, seq_length, width]` encoder output
    output: Tensor<B, 3>,

    /// Per-item lengths, boundary markers included
    lengths: Lengths,
}

impl<B: AutodiffBackend> Backprop<B> {
    /// Restore the marker rows, pad to the captured sequence length, and run the backward
    /// pass of the encoder seeded with the resulting gradient tensor.
    pub fn apply(
        self,
        d_tokvecs: Vec<Tensor<B::InnerBackend, 2>>,
    ) -> Result<B::Gradients, BridgeError> {
        if d_tokvecs.len() != self.lengths.len() {
            return Err(BridgeError::InvalidLength(format!(
                "got {} gradients for a batch of {} items",
                d_tokvecs.len(),
                self.lengths.len()
            )));
        }

        for (index, (d_tokvec, &length)) in d_tokvecs.iter().zip(self.lengths.iter()).enumerate()
        {
            let [rows, _] = d_tokvec.dims();

            if rows + MARKERS != length {
                return Err(BridgeError::InvalidLength(format!(
                    "gradient {} has {} rows, expected {}",
                    index,
                    rows,
                    length - MARKERS
                )));
            }
        }

        let [_, seq_length, width] = self.output.dims();

        let (restored, _) = restore_markers(d_tokvecs)?;

        if let Some(actual) = restored.first().map(|r| r.dims()[1]) {
            if actual != width {
                return Err(BridgeError::ShapeMismatch {
                    index: 0,
                    expected: width,
                    actual,
                });
            }
        }

        let d_output = Tensor::<B, 3>::from_inner(tensors::pad(restored, seq_length));

        Ok((self.output * d_output).sum().backward())
    }
}
