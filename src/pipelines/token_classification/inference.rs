use burn::tensor::backend::Backend;
use serde::Serialize;

use crate::models::Tagger;

use super::{training::load_artifacts, Batcher};

/// A word with its predicted tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tagged {
    /// The word
    pub word: String,

    /// The highest scoring tag
    pub tag: String,

    /// The score of that tag (a probability when outputs are normalized)
    pub score: f32,
}

/// Define inference function
pub fn infer<B: Backend>(
    device: B::Device,           // Device on which to perform computation
    artifact_dir: &str,          // Directory holding the trained model and configs
    sentences: Vec<Vec<String>>, // Pre-split sentences to tag
) -> anyhow::Result<Vec<Vec<Tagged>>> {
    let (model, batcher, _) = load_artifacts::<B>(artifact_dir, device)?;

    tag(&model, &batcher, sentences)
}

/// Tag a batch of pre-split sentences. Words cut off by truncation, and words that produce no
/// tokens, are left untagged.
pub fn tag<B: Backend>(
    model: &Tagger<B>,
    batcher: &Batcher<B>,
    sentences: Vec<Vec<String>>,
) -> anyhow::Result<Vec<Vec<Tagged>>> {
    let batch = batcher.encode(&sentences)?;
    let alignments = batch.alignments.clone();
    let guesses = model.predict(batch)?;

    sentences
        .into_iter()
        .zip(alignments)
        .zip(guesses)
        .map(|((words, alignment), guess)| {
            let [rows, _] = guess.dims();
            if rows == 0 {
                return Ok(Vec::new());
            }

            let ids = guess
                .clone()
                .argmax(1)
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .map_err(|e| anyhow!("Unable to read predicted tags: {:?}", e))?;

            let scores = guess
                .max_dim(1)
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Unable to read predicted scores: {:?}", e))?;

            alignment
                .into_iter()
                .zip(ids.into_iter().zip(scores))
                .map(|(start, (id, score))| {
                    let word = words
                        .get(start.word)
                        .cloned()
                        .ok_or_else(|| anyhow!("Aligned to a missing word {}", start.word))?;

                    let tag = batcher
                        .tags
                        .get(id as usize)
                        .cloned()
                        .ok_or_else(|| anyhow!("Predicted an unknown tag id {}", id))?;

                    Ok(Tagged { word, tag, score })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        models::{encoder::EncoderConfig, TaggerConfig},
        pipelines::token_classification::tokenizer::word_level,
    };

    type TestBackend = NdArray<f32>;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tag_skips_words_without_tokens() {
        let device = NdArrayDevice::Cpu;
        let tokenizer = word_level(words("el gato come")).unwrap();
        let config = TaggerConfig::new(
            EncoderConfig::new(tokenizer.get_vocab_size(true), 8, 1, 2, 16, 16),
            words("DET NOUN VERB"),
        );

        let model = config.init::<TestBackend>(&device);
        let batcher = Batcher::<TestBackend>::new(tokenizer, &config, 16, device).unwrap();

        let sentence = vec!["el".to_string(), String::new(), "gato".to_string()];
        let tagged = tag(&model, &batcher, vec![sentence, words("come")]).unwrap();

        let tagged_words: Vec<Vec<String>> = tagged
            .iter()
            .map(|sentence| sentence.iter().map(|t| t.word.clone()).collect())
            .collect();
        assert_eq!(tagged_words, vec![words("el gato"), words("come")]);

        for word in tagged.iter().flatten() {
            assert!(config.tags.contains(&word.tag));
        }
    }
}
