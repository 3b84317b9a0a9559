/// Batcher
pub mod batcher;

/// Token Classification Items
pub mod item;

/// Token Classification Config
pub mod config;

/// Sequence crossentropy loss
pub mod loss;

/// Word-level tokenizers
pub mod tokenizer;

/// Token Classification Training
pub mod training;

/// Token Classification Evaluation
pub mod evaluation;

/// Token Classification Inference
pub mod inference;

/// The unique string token that identifies this pipeline
pub static PIPELINE: &str = "token-classification";

pub use batcher::Batcher;
pub use config::Config;
pub use evaluation::evaluate_sequences;
pub use inference::{infer, Tagged};
pub use item::Item;
pub use training::{train, Starter};
