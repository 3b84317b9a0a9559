use crate::bridge::BridgeError;

/// BERT-style transformer encoder
pub mod encoder;

/// Softmax output layer
pub mod softmax;

/// Transformer tagger
pub mod tagger;

pub use tagger::{Tagger, TaggerConfig};

/// Layer Error
#[derive(thiserror::Error, Debug)]
pub enum LayerError {
    /// Backprop was requested from a layer that cannot provide it
    #[error("backprop is not supported for an unnormalized softmax layer outside training")]
    BackpropUnsupported,

    /// A gradient does not match the shape of the output it belongs to
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The shape of the forward output
        expected: [usize; 2],

        /// The shape of the gradient
        actual: [usize; 2],
    },

    /// None of the items in a batch has a word to tag
    #[error("no words to tag in the batch")]
    NoWords,

    /// The sequence bridge rejected its input
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
