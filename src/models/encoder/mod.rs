/// Encoder configuration
pub mod config;

/// Encoder model
pub mod model;

/// Loading pretrained weights
pub mod pretrained;

pub use config::EncoderConfig;
pub use model::{Embeddings, Encoder, EncoderInput};
