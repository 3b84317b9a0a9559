use burn::{
    config::Config,
    nn::{
        transformer::TransformerEncoderConfig, DropoutConfig, EmbeddingConfig, LayerNormConfig,
    },
    tensor::backend::Backend,
};

use super::{Embeddings, Encoder};

/// Configuration for a BERT-style encoder. Field names follow the Hugging Face `config.json`
/// format so that a pretrained model's configuration can be loaded directly.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Size of the token vocabulary
    pub vocab_size: usize,

    /// Width of the hidden states
    pub hidden_size: usize,

    /// Number of transformer layers
    pub num_hidden_layers: usize,

    /// Number of attention heads per layer
    pub num_attention_heads: usize,

    /// Width of the position-wise feed-forward layer
    pub intermediate_size: usize,

    /// Maximum number of positions (and so tokens) per sequence
    pub max_position_embeddings: usize,

    /// Number of token type (segment) ids
    #[config(default = 2)]
    pub type_vocab_size: usize,

    /// Dropout rate
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Layer norm epsilon for the embeddings
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,

    /// The padding token ID
    #[config(default = 0)]
    pub pad_token_id: usize,
}

impl EncoderConfig {
    /// Initialize a randomly weighted encoder
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let embeddings = Embeddings {
            word_embeddings: EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings: EmbeddingConfig::new(
                self.max_position_embeddings,
                self.hidden_size,
            )
            .init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size)
                .init(device),
            layer_norm: LayerNormConfig::new(self.hidden_size)
                .with_epsilon(self.layer_norm_eps)
                .init(device),
            dropout: DropoutConfig::new(self.hidden_dropout_prob).init(),
        };

        let encoder = TransformerEncoderConfig::new(
            self.hidden_size,
            self.intermediate_size,
            self.num_attention_heads,
            self.num_hidden_layers,
        )
        .with_dropout(self.hidden_dropout_prob)
        .with_norm_first(false)
        .init(device);

        Encoder {
            embeddings,
            encoder,
            hidden_size: self.hidden_size,
        }
    }
}
