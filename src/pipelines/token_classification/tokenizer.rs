use std::collections::HashMap;

use tokenizers::{
    models::wordlevel::WordLevel, pre_tokenizers::whitespace::WhitespaceSplit,
    processors::bert::BertProcessing, Tokenizer,
};

/// Padding token for word-level vocabularies
pub const PAD: &str = "[PAD]";

/// Leading boundary marker
pub const CLS: &str = "[CLS]";

/// Trailing boundary marker
pub const SEP: &str = "[SEP]";

/// Unknown word token
pub const UNK: &str = "[UNK]";

/// Build a word-level tokenizer with BERT-style boundary markers over the given vocabulary.
/// The special tokens take ids 0 through 3, with `[PAD]` at 0.
pub fn word_level<I>(words: I) -> anyhow::Result<Tokenizer>
where
    I: IntoIterator<Item = String>,
{
    let mut vocab: HashMap<String, u32> = [PAD, CLS, SEP, UNK]
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), id as u32))
        .collect();

    for word in words {
        let next = vocab.len() as u32;
        vocab.entry(word).or_insert(next);
    }

    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token(UNK.to_string())
        .build()
        .map_err(|e| anyhow!("Unable to build the word-level vocabulary: {}", e))?;

    let mut tokenizer = Tokenizer::new(model);
    tokenizer
        .with_pre_tokenizer(WhitespaceSplit)
        .with_post_processor(BertProcessing::new(
            (SEP.to_string(), 2),
            (CLS.to_string(), 1),
        ));

    Ok(tokenizer)
}
