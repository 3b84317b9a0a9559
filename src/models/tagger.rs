use burn::{
    config::Config,
    module::Module,
    optim::{GradientsAccumulator, GradientsParams},
    tensor::{
        backend::{AutodiffBackend, Backend},
        Int, Tensor, TensorData,
    },
};

use crate::{
    bridge::{self, BridgeError},
    pipelines::token_classification::batcher::{Infer, WordStart},
    utils::tensors,
};

use super::{
    encoder::{Encoder, EncoderConfig},
    softmax::{Softmax, SoftmaxBackprop, SoftmaxConfig},
    LayerError,
};

/// Configuration for the transformer tagger
#[derive(Config, Debug)]
pub struct TaggerConfig {
    /// The encoder configuration
    pub encoder: EncoderConfig,

    /// Tag names, indexed by class id
    pub tags: Vec<String>,

    /// Normalize predictions into probabilities
    #[config(default = true)]
    pub normalize_outputs: bool,
}

impl TaggerConfig {
    /// Total number of tags
    pub fn n_tags(&self) -> usize {
        self.tags.len()
    }

    /// Initialize a randomly weighted tagger
    pub fn init<B: Backend>(&self, device: &B::Device) -> Tagger<B> {
        Tagger {
            encoder: self.encoder.init(device),
            output: SoftmaxConfig::new(self.encoder.hidden_size, self.n_tags())
                .with_normalize_outputs(self.normalize_outputs)
                .init(device),
            n_tags: self.n_tags(),
        }
    }
}

/// A transformer encoder with a softmax output layer, predicting one tag per word from the
/// hidden state of the word's first subword token
#[derive(Module, Debug)]
pub struct Tagger<B: Backend> {
    /// The transformer encoder
    pub encoder: Encoder<B>,

    /// The softmax output layer
    pub output: Softmax<B>,

    /// Total number of tags
    pub n_tags: usize,
}

impl<B: Backend> Tagger<B> {
    /// Predict tag scores: one `[words, n_tags]` tensor per item
    pub fn predict(&self, batch: Infer<B>) -> Result<Vec<Tensor<B, 2>>, LayerError> {
        let Infer {
            input,
            lengths,
            alignments,
        } = batch;

        let device = input.tokens.device();
        let hidden = self.encoder.forward(input);
        let tokvecs = bridge::unpad_and_trim(hidden, &lengths)?;

        let words = select_words(&tokvecs, &alignments)?;
        let counts: Vec<usize> = words.iter().map(|w| w.dims()[0]).collect();

        let Some(flat) = tensors::flatten(words) else {
            return Ok(counts
                .iter()
                .map(|_| Tensor::zeros([0, self.n_tags], &device))
                .collect());
        };

        Ok(tensors::unflatten(self.output.forward(flat), &counts))
    }
}

impl<B: AutodiffBackend> Tagger<B> {
    /// Run the tagger in training mode, returning the guesses along with the value that
    /// backpropagates their gradients
    pub fn begin_update(
        &self,
        batch: Infer<B>,
    ) -> Result<(Vec<Tensor<B, 2>>, TaggerBackprop<B>), LayerError> {
        let Infer {
            input,
            lengths,
            alignments,
        } = batch;

        let hidden = self.encoder.forward(input);
        let (tokvecs, bridge) = bridge::begin_update(hidden, lengths, true)?;

        let words = select_words(&tokvecs, &alignments)?;
        let counts: Vec<usize> = words.iter().map(|w| w.dims()[0]).collect();

        let flat = tensors::flatten(words).ok_or(LayerError::NoWords)?;
        let (output, head) = self.output.begin_update(flat, true);

        let guesses = tensors::unflatten(output, &counts);

        Ok((
            guesses,
            TaggerBackprop {
                tokvecs,
                head,
                bridge,
                counts,
            },
        ))
    }
}

/// Gather the row of each word's first subword token
fn select_words<B: Backend>(
    tokvecs: &[Tensor<B, 2>],
    alignments: &[Vec<WordStart>],
) -> Result<Vec<Tensor<B, 2>>, BridgeError> {
    if tokvecs.len() != alignments.len() {
        return Err(BridgeError::InvalidLength(format!(
            "got {} word alignments for a batch of {} items",
            alignments.len(),
            tokvecs.len()
        )));
    }

    tokvecs
        .iter()
        .zip(alignments)
        .enumerate()
        .map(|(index, (tokvec, alignment))| {
            let [rows, width] = tokvec.dims();

            if alignment.is_empty() {
                return Ok(tokvec.clone().slice([0..0, 0..width]));
            }

            if let Some(start) = alignment.iter().find(|start| start.row >= rows) {
                return Err(BridgeError::InvalidLength(format!(
                    "item {} aligns word {} to row {}, but only has {} rows",
                    index, start.word, start.row, rows
                )));
            }

            let positions: Vec<i64> = alignment.iter().map(|start| start.row as i64).collect();
            let indices = Tensor::<B, 1, Int>::from_data(
                TensorData::new(positions, [alignment.len()]).convert::<B::IntElem>(),
                &tokvec.device(),
            );

            Ok(tokvec.clone().select(0, indices))
        })
        .collect()
}

/// Backward value for the tagger
pub struct TaggerBackprop<B: AutodiffBackend> {
    tokvecs: Vec<Tensor<B, 2>>,
    head: SoftmaxBackprop<B>,
    bridge: bridge::Backprop<B>,
    counts: Vec<usize>,
}

impl<B: AutodiffBackend> TaggerBackprop<B> {
    /// Backpropagate per-item gradients of the guesses through the output layer, the bridge
    /// and the encoder
    pub fn apply(
        self,
        d_guesses: Vec<Tensor<B::InnerBackend, 2>>,
    ) -> Result<TaggerGradients<B>, LayerError> {
        let counts: Vec<usize> = d_guesses.iter().map(|d| d.dims()[0]).collect();
        if counts != self.counts {
            return Err(BridgeError::InvalidLength(format!(
                "gradient row counts {:?} do not match the guesses {:?}",
                counts, self.counts
            ))
            .into());
        }

        let d_output = tensors::flatten(d_guesses).ok_or(LayerError::NoWords)?;
        let output = self.head.apply(d_output)?;

        // Tokens that were not selected as a word's first piece get no gradient
        let d_tokvecs = self
            .tokvecs
            .iter()
            .map(|tokvec| {
                tokvec
                    .grad(&output)
                    .unwrap_or_else(|| Tensor::zeros(tokvec.dims(), &tokvec.device()))
            })
            .collect();

        let encoder = self.bridge.apply(d_tokvecs)?;

        Ok(TaggerGradients { output, encoder })
    }
}

/// Gradients from one backward pass, split between the output layer and the encoder
pub struct TaggerGradients<B: AutodiffBackend> {
    /// Gradients of the output layer
    pub output: B::Gradients,

    /// Gradients of the encoder
    pub encoder: B::Gradients,
}

impl<B: AutodiffBackend> TaggerGradients<B> {
    /// Add both sets of gradients to an accumulator
    pub fn accumulate(
        self,
        model: &Tagger<B>,
        accumulator: &mut GradientsAccumulator<Tagger<B>>,
    ) {
        accumulator.accumulate(model, GradientsParams::from_grads(self.output, model));
        accumulator.accumulate(model, GradientsParams::from_grads(self.encoder, model));
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{bridge::Lengths, models::encoder::EncoderInput};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn config() -> TaggerConfig {
        TaggerConfig::new(
            EncoderConfig::new(16, 8, 1, 2, 16, 10).with_hidden_dropout_prob(0.0),
            vec!["DET".to_string(), "NOUN".to_string(), "VERB".to_string()],
        )
    }

    fn batch(device: &NdArrayDevice) -> Infer<TestBackend> {
        let tokens = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::from([[1i64, 5, 6, 7, 2], [1, 8, 2, 0, 0]]),
            device,
        );
        let token_types = tokens.zeros_like();
        let mask_pad = tokens.clone().equal_elem(0);

        Infer {
            input: EncoderInput::new(tokens, token_types, mask_pad),
            lengths: Lengths::new(vec![5, 3]),
            // The second word of the first item spans two pieces
            alignments: vec![
                vec![WordStart::new(0, 0), WordStart::new(1, 1)],
                vec![WordStart::new(0, 0)],
            ],
        }
    }

    #[test]
    fn test_predict_one_row_per_word() {
        let device = NdArrayDevice::Cpu;
        let model = config().init::<TestBackend>(&device);

        let guesses = model.predict(batch(&device)).unwrap();

        let dims: Vec<_> = guesses.iter().map(|g| g.dims()).collect();
        assert_eq!(dims, vec![[2, 3], [1, 3]]);
    }

    #[test]
    fn test_backprop_reaches_the_encoder() {
        let device = NdArrayDevice::Cpu;
        let model = config().init::<TestBackend>(&device);

        let (guesses, backprop) = model.begin_update(batch(&device)).unwrap();
        let d_guesses = guesses
            .iter()
            .map(|g| g.clone().inner().ones_like())
            .collect();

        let grads = backprop.apply(d_guesses).unwrap();

        let word_embeddings = model.encoder.embeddings.word_embeddings.weight.val();
        assert!(word_embeddings.grad(&grads.encoder).is_some());

        let output_weight = model.output.linear.weight.val();
        assert!(output_weight.grad(&grads.output).is_some());
    }

    #[test]
    fn test_backprop_rejects_wrong_row_counts() {
        let device = NdArrayDevice::Cpu;
        let model = config().init::<TestBackend>(&device);

        let (_, backprop) = model.begin_update(batch(&device)).unwrap();
        let d_guesses = vec![
            Tensor::zeros([1, 3], &device),
            Tensor::zeros([1, 3], &device),
        ];

        let err = backprop.apply(d_guesses).err().unwrap();

        assert!(matches!(
            err,
            LayerError::Bridge(BridgeError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_alignment_out_of_range() {
        let device = NdArrayDevice::Cpu;
        let model = config().init::<TestBackend>(&device);

        let mut input = batch(&device);
        input.alignments = vec![
            vec![WordStart::new(0, 0), WordStart::new(1, 9)],
            vec![WordStart::new(0, 0)],
        ];

        assert!(model.predict(input).is_err());
    }
}
