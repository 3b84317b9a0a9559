use std::fmt::Display;

/// bert-base-multilingual-cased
pub static BASE_MULTILINGUAL_CASED: &str = "bert-base-multilingual-cased";

/// bert-base-cased
pub static BASE_CASED: &str = "bert-base-cased";

/// bert-base-uncased
pub static BASE_UNCASED: &str = "bert-base-uncased";

/// All available BERT starters
pub static BERT_MODELS: &[&str; 3] = &[BASE_MULTILINGUAL_CASED, BASE_CASED, BASE_UNCASED];

/// A small randomly initialized encoder with a word-level vocabulary
pub static RANDOM: &str = "random";

/// Available starter models
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Model {
    /// A pretrained BERT encoder from the Hugging Face Hub
    Bert(String),

    /// A randomly initialized encoder, trained from scratch
    Random,
}

impl Model {
    /// Get the model type
    pub fn model_type(&self) -> &str {
        match self {
            Model::Bert(_) => "bert",
            Model::Random => RANDOM,
        }
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::Bert(name) => write!(f, "{}", name),
            Model::Random => write!(f, "{}", RANDOM),
        }
    }
}

impl TryFrom<&str> for Model {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if BERT_MODELS.contains(&value) {
            Ok(Model::Bert(value.to_string()))
        } else if value == RANDOM {
            Ok(Model::Random)
        } else {
            Err(ModelError::Unknown(value.to_string()))
        }
    }
}

/// Model Error
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// No model found for the given string
    #[error("no model found for {0}")]
    Unknown(String),
}
