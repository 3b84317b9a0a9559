//! Conversion between the padded output of an encoder and ragged per-item feature arrays.
//!
//! Every tokenized item carries a leading and trailing boundary marker (`[CLS]` and `[SEP]`
//! for BERT). The forward direction drops those rows along with the padding, and the backward
//! direction puts zero rows back in their place before padding the gradient again.

use std::ops::Deref;

use burn::tensor::{
    backend::{AutodiffBackend, Backend},
    Tensor,
};

use crate::utils::tensors;

/// Bridge errors
pub mod error;

/// The explicit backward value returned by `begin_update`
pub mod backprop;

pub use backprop::Backprop;
pub use error::BridgeError;

/// Number of boundary marker rows wrapped around every item (one leading, one trailing)
pub const MARKERS: usize = 2;

/// Per-item sequence lengths, boundary markers included
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lengths(Vec<usize>);

impl Lengths {
    /// Wrap a list of per-item lengths
    pub fn new(lengths: Vec<usize>) -> Self {
        Self(lengths)
    }

    /// The longest item, or zero for an empty batch
    pub fn max_length(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Unwrap into the underlying list
    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for Lengths {
    fn from(lengths: Vec<usize>) -> Self {
        Self(lengths)
    }
}

impl Deref for Lengths {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Split a padded `[batch_size, seq_length, width]` tensor into one `[length - 2, width]`
/// tensor per item, dropping the padding and both boundary marker rows.
pub fn unpad_and_trim<B: Backend>(
    padded: Tensor<B, 3>,
    lengths: &Lengths,
) -> Result<Vec<Tensor<B, 2>>, BridgeError> {
    let [batch_size, seq_length, width] = padded.dims();

    if lengths.len() != batch_size {
        return Err(BridgeError::InvalidLength(format!(
            "got {} lengths for a batch of {} items",
            lengths.len(),
            batch_size
        )));
    }

    lengths
        .iter()
        .enumerate()
        .map(|(index, &length)| {
            if length < MARKERS {
                return Err(BridgeError::InvalidLength(format!(
                    "item {} has length {}, too short to hold both boundary markers",
                    index, length
                )));
            }

            if length > seq_length {
                return Err(BridgeError::InvalidLength(format!(
                    "item {} has length {}, but the padded sequence length is {}",
                    index, length, seq_length
                )));
            }

            Ok(padded
                .clone()
                .slice([index..index + 1, 1..length - 1, 0..width])
                .squeeze_dim::<2>(0))
        })
        .collect()
}

/// Wrap each gradient in zero-filled marker rows and pad the result into a single
/// `[batch_size, max_length, width]` tensor, returning the restored lengths alongside it.
pub fn repad_with_markers<B: Backend>(
    grads: Vec<Tensor<B, 2>>,
) -> Result<(Tensor<B, 3>, Lengths), BridgeError> {
    let (restored, lengths) = restore_markers(grads)?;

    let padded = tensors::pad(restored, lengths.max_length());

    Ok((padded, lengths))
}

/// Prepend and append a zero row to every gradient
pub(crate) fn restore_markers<B: Backend>(
    grads: Vec<Tensor<B, 2>>,
) -> Result<(Vec<Tensor<B, 2>>, Lengths), BridgeError> {
    let first = grads.first().ok_or(BridgeError::EmptyBatch)?;
    let [_, width] = first.dims();
    let device = first.device();

    for (index, grad) in grads.iter().enumerate() {
        let [_, actual] = grad.dims();

        if actual != width {
            return Err(BridgeError::ShapeMismatch {
                index,
                expected: width,
                actual,
            });
        }
    }

    let marker = Tensor::<B, 2>::zeros([1, width], &device);

    let mut lengths = Vec::with_capacity(grads.len());
    let mut restored = Vec::with_capacity(grads.len());

    for grad in grads {
        let [rows, _] = grad.dims();
        lengths.push(rows + MARKERS);

        restored.push(Tensor::cat(vec![marker.clone(), grad, marker.clone()], 0));
    }

    Ok((restored, Lengths::new(lengths)))
}

/// Run the forward conversion on an autodiff-tracked encoder output.
///
/// The returned items are cut loose from the encoder graph. In training mode each one is a
/// fresh leaf that requires a gradient, so that downstream layers can be differentiated on
/// their own and the result handed back through [`Backprop::apply`].
pub fn begin_update<B: AutodiffBackend>(
    output: Tensor<B, 3>,
    lengths: Lengths,
    is_train: bool,
) -> Result<(Vec<Tensor<B, 2>>, Backprop<B>), BridgeError> {
    let tokvecs = unpad_and_trim(output.clone().detach(), &lengths)?;

    // Slices of a tracked tensor stay in its graph, so leaves are rebuilt from the raw values
    let tokvecs = if is_train {
        tokvecs
            .into_iter()
            .map(|t| Tensor::from_inner(t.inner()).require_grad())
            .collect()
    } else {
        tokvecs
    };

    Ok((tokvecs, Backprop::new(output, lengths)))
}
