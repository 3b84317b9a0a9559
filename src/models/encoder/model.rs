use burn::{
    module::Module,
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderInput},
        Dropout, Embedding, LayerNorm,
    },
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;

/// Input for the encoder
#[derive(Debug, Clone, new)]
pub struct EncoderInput<B: Backend> {
    /// Token ids as 2D tensor: [batch_size, seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Token type (segment) ids: [batch_size, seq_length]
    pub token_types: Tensor<B, 2, Int>,

    /// Padding mask containing booleans for padding locations: [batch_size, seq_length]
    pub mask_pad: Tensor<B, 2, Bool>,
}

/// Word, position and token type embeddings
#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    /// Word piece embeddings
    pub word_embeddings: Embedding<B>,

    /// Absolute position embeddings
    pub position_embeddings: Embedding<B>,

    /// Token type embeddings
    pub token_type_embeddings: Embedding<B>,

    /// Normalization applied to the summed embeddings
    pub layer_norm: LayerNorm<B>,

    /// Embedding dropout
    pub dropout: Dropout,
}

impl<B: Backend> Embeddings<B> {
    /// Sum the three embeddings for each position
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        token_types: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_length] = tokens.dims();
        let device = tokens.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_length as i64, &device)
            .reshape([1, seq_length])
            .repeat_dim(0, batch_size);

        let embedded = self.word_embeddings.forward(tokens)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_types);

        self.dropout.forward(self.layer_norm.forward(embedded))
    }
}

/// A BERT-style transformer encoder producing one hidden state per token
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    /// Input embeddings
    pub embeddings: Embeddings<B>,

    /// The transformer layers
    pub encoder: TransformerEncoder<B>,

    /// Width of the hidden states
    pub hidden_size: usize,
}

impl<B: Backend> Encoder<B> {
    /// Encode a batch into hidden states: [batch_size, seq_length, hidden_size]
    pub fn forward(&self, input: EncoderInput<B>) -> Tensor<B, 3> {
        let embedded = self.embeddings.forward(input.tokens, input.token_types);

        self.encoder
            .forward(TransformerEncoderInput::new(embedded).mask_pad(input.mask_pad))
    }
}
