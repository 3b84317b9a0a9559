use std::collections::{BTreeMap, BTreeSet};

use burn::{
    nn::attention::generate_padding_mask,
    tensor::{backend::Backend, Tensor, TensorData},
};
use derive_new::new;
use tokenizers::{Tokenizer, TruncationParams};

use crate::{
    bridge::{Lengths, MARKERS},
    models::{encoder::EncoderInput, TaggerConfig},
    utils::{classes::invert_map, tensors},
};

use super::Item;

/// An inference batch for token classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Encoder input
    pub input: EncoderInput<B>,

    /// Token count of each item, boundary markers included
    pub lengths: Lengths,

    /// For each item, where each tokenized word starts
    pub alignments: Vec<Vec<WordStart>>,
}

/// The first subword token of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct WordStart {
    /// Index of the word in its sentence
    pub word: usize,

    /// Row of the token once the leading marker is removed
    pub row: usize,
}

/// A training batch for token classification
#[derive(Debug, Clone, new)]
pub struct Train<B: Backend> {
    /// Tagger input
    pub input: Infer<B>,

    /// One-hot tags for each item: [words, n_tags]
    pub targets: Vec<Tensor<B, 2>>,
}

/// Struct for batching token classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Tokenizer for converting words to token IDs
    pub tokenizer: Tokenizer,

    /// Maximum sequence length for tokenized text, boundary markers included
    pub max_seq_length: usize,

    /// ID of the padding token
    pub pad_token_id: usize,

    /// Tag names, indexed by class id
    pub tags: Vec<String>,

    /// A mapping from tag names to class ids
    pub tag2id: BTreeMap<String, usize>,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher, configuring the tokenizer to truncate at `max_seq_length`
    pub fn new(
        mut tokenizer: Tokenizer,
        config: &TaggerConfig,
        max_seq_length: usize,
        device: B::Device,
    ) -> anyhow::Result<Self> {
        let max_seq_length = usize::min(max_seq_length, config.encoder.max_position_embeddings);

        if max_seq_length <= MARKERS {
            return Err(anyhow!(
                "The maximum sequence length must leave room for at least one token between the boundary markers, got {}",
                max_seq_length
            ));
        }

        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Unable to configure truncation: {}", e))?;

        Ok(Self {
            tokenizer,
            max_seq_length,
            pad_token_id: config.encoder.pad_token_id,
            tags: config.tags.clone(),
            tag2id: invert_map(config.tags.iter().cloned().enumerate()),
            device,
        })
    }

    /// Tokenize a batch of pre-split sentences
    pub fn encode(&self, sentences: &[Vec<String>]) -> anyhow::Result<Infer<B>> {
        if sentences.is_empty() {
            return Err(anyhow!("Unable to encode an empty batch"));
        }

        let batch_size = sentences.len();

        let mut token_ids_list = Vec::with_capacity(batch_size);
        let mut token_types_list = Vec::with_capacity(batch_size);
        let mut lengths = Vec::with_capacity(batch_size);
        let mut alignments = Vec::with_capacity(batch_size);

        for words in sentences {
            let encoding = self
                .tokenizer
                .encode(words.as_slice(), true)
                .map_err(|e| anyhow!("Unable to encode {:?}: {}", words, e))?;

            if encoding.len() < MARKERS {
                return Err(anyhow!(
                    "The tokenizer did not add boundary markers to {:?}",
                    words
                ));
            }

            token_ids_list.push(encoding.get_ids().iter().map(|t| *t as usize).collect());
            token_types_list.push(
                encoding
                    .get_type_ids()
                    .iter()
                    .map(|t| *t as usize)
                    .collect(),
            );
            lengths.push(encoding.len());
            alignments.push(align_words(encoding.get_word_ids()));
        }

        let padding = generate_padding_mask(
            self.pad_token_id,
            token_ids_list,
            Some(self.max_seq_length),
            &self.device,
        );

        let [_, seq_length] = padding.tensor.dims();
        let token_types = tensors::pad_to::<B>(0, token_types_list, seq_length, &self.device);

        Ok(Infer {
            input: EncoderInput::new(padding.tensor, token_types, padding.mask),
            lengths: Lengths::new(lengths),
            alignments,
        })
    }

    /// Tokenize a batch of tagged sentences, with one-hot targets for every word that
    /// survived truncation
    pub fn batch_train<I: Item>(&self, items: &[I]) -> anyhow::Result<Train<B>> {
        let sentences: Vec<Vec<String>> = items.iter().map(|item| item.words().to_vec()).collect();

        let input = self.encode(&sentences)?;
        let n_tags = self.tags.len();

        let targets = items
            .iter()
            .zip(&input.alignments)
            .map(|(item, alignment)| {
                if item.tags().len() != item.words().len() {
                    return Err(anyhow!(
                        "Item has {} words but {} tags",
                        item.words().len(),
                        item.tags().len()
                    ));
                }

                let n_words = alignment.len();
                let mut one_hot = vec![0.0f32; n_words * n_tags];

                for (row, start) in alignment.iter().enumerate() {
                    let tag = item
                        .tags()
                        .get(start.word)
                        .ok_or_else(|| anyhow!("No tag for word {}", start.word))?;

                    let id = self
                        .tag2id
                        .get(tag)
                        .ok_or_else(|| anyhow!("Unknown tag: {}", tag))?;

                    one_hot[row * n_tags + id] = 1.0;
                }

                Ok(Tensor::from_data(
                    TensorData::new(one_hot, [n_words, n_tags]).convert::<B::FloatElem>(),
                    &self.device,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Train { input, targets })
    }
}

/// Locate the first subword token of every word that was tokenized, with rows counted after
/// the leading marker is removed. Words cut off by truncation, and words that produce no
/// tokens at all, are left out.
fn align_words(word_ids: &[Option<u32>]) -> Vec<WordStart> {
    let content = word_ids.len().saturating_sub(MARKERS);
    let mut seen = BTreeSet::new();

    word_ids
        .iter()
        .skip(1)
        .take(content)
        .enumerate()
        .filter_map(|(row, word_id)| {
            let word = (*word_id)? as usize;

            seen.insert(word).then(|| WordStart::new(word, row))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        datasets::ud_ancora,
        models::encoder::EncoderConfig,
        pipelines::token_classification::tokenizer::word_level,
    };

    type TestBackend = NdArray<f32>;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(|w| w.to_string()).collect()
    }

    fn batcher(max_seq_length: usize) -> Batcher<TestBackend> {
        let tokenizer = word_level(words("el gato come pescado")).unwrap();
        let config = TaggerConfig::new(
            EncoderConfig::new(8, 4, 1, 1, 8, 16),
            words("DET NOUN VERB"),
        );

        Batcher::new(tokenizer, &config, max_seq_length, NdArrayDevice::Cpu).unwrap()
    }

    #[test]
    fn test_align_words_first_pieces() {
        // [CLS] un ##believ ##able day [SEP]
        let word_ids = [None, Some(0), Some(0), Some(0), Some(1), None];

        assert_eq!(
            align_words(&word_ids),
            vec![WordStart::new(0, 0), WordStart::new(1, 3)]
        );
    }

    #[test]
    fn test_encode_lengths_include_markers() {
        let batcher = batcher(16);

        let batch = batcher
            .encode(&[words("el gato come pescado"), words("el gato")])
            .unwrap();

        assert_eq!(batch.lengths.clone().into_inner(), vec![6, 4]);
        assert_eq!(
            batch.alignments,
            vec![
                vec![
                    WordStart::new(0, 0),
                    WordStart::new(1, 1),
                    WordStart::new(2, 2),
                    WordStart::new(3, 3)
                ],
                vec![WordStart::new(0, 0), WordStart::new(1, 1)]
            ]
        );
        assert_eq!(batch.input.tokens.dims(), [2, 6]);

        let mask = batch
            .input
            .mask_pad
            .into_data()
            .to_vec::<bool>()
            .unwrap();
        assert_eq!(&mask[6..], &[false, false, false, false, true, true]);
    }

    #[test]
    fn test_truncation_drops_trailing_words() {
        let batcher = batcher(4);

        let batch = batcher.encode(&[words("el gato come pescado")]).unwrap();

        assert_eq!(batch.lengths.clone().into_inner(), vec![4]);
        assert_eq!(
            batch.alignments,
            vec![vec![WordStart::new(0, 0), WordStart::new(1, 1)]]
        );
    }

    #[test]
    fn test_batch_train_targets() {
        let batcher = batcher(16);
        let item = ud_ancora::Item::new(words("el gato come"), words("DET NOUN VERB"));

        let batch = batcher.batch_train(&[item]).unwrap();

        batch.targets[0].to_data().assert_eq(
            &TensorData::from([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            false,
        );
    }

    #[test]
    fn test_align_words_skips_gaps() {
        // [CLS] el gato ##s [SEP], where word 1 produced no tokens
        let word_ids = [None, Some(0), Some(2), Some(2), None];

        assert_eq!(
            align_words(&word_ids),
            vec![WordStart::new(0, 0), WordStart::new(2, 1)]
        );
    }

    #[test]
    fn test_word_without_tokens_keeps_later_words() {
        let batcher = batcher(16);
        let sentence = vec![
            "el".to_string(),
            String::new(),
            "gato".to_string(),
            "come".to_string(),
        ];

        let batch = batcher.encode(&[sentence.clone()]).unwrap();

        assert_eq!(
            batch.alignments,
            vec![vec![
                WordStart::new(0, 0),
                WordStart::new(2, 1),
                WordStart::new(3, 2)
            ]]
        );

        let item = ud_ancora::Item::new(sentence, words("DET NOUN NOUN VERB"));
        let batch = batcher.batch_train(&[item]).unwrap();

        batch.targets[0].to_data().assert_eq(
            &TensorData::from([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            false,
        );
    }

    #[test]
    fn test_batch_train_unknown_tag() {
        let batcher = batcher(16);
        let item = ud_ancora::Item::new(words("el gato"), words("DET PROPN"));

        assert!(batcher.batch_train(&[item]).is_err());
    }

    #[test]
    fn test_max_seq_length_too_short() {
        let tokenizer = word_level(words("el")).unwrap();
        let config = TaggerConfig::new(EncoderConfig::new(8, 4, 1, 1, 8, 16), words("DET"));

        assert!(Batcher::<TestBackend>::new(tokenizer, &config, 2, NdArrayDevice::Cpu).is_err());
    }
}
