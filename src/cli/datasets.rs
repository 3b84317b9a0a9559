use std::fmt::Display;

use crate::datasets::{dummy, ud_ancora};

use super::models::{self, Model};

/// The Dataset enum
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Dataset {
    /// UD Spanish AnCora
    UdAncora,

    /// Synthetic sentences
    Dummy,
}

impl Dataset {
    /// Get the default starter model for the given dataset
    pub fn default_model(&self) -> Model {
        match self {
            Dataset::UdAncora => Model::Bert(models::BASE_MULTILINGUAL_CASED.to_string()),
            Dataset::Dummy => Model::Random,
        }
    }
}

impl TryFrom<&str> for Dataset {
    type Error = DatasetError;

    /// Try to convert a string to a Dataset
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let name = value.to_lowercase();

        if name == ud_ancora::DATASET {
            Ok(Dataset::UdAncora)
        } else if name == dummy::DATASET {
            Ok(Dataset::Dummy)
        } else {
            Err(Self::Error::Unknown(value.to_string()))
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dataset::UdAncora => ud_ancora::DATASET,
            Dataset::Dummy => dummy::DATASET,
        };

        write!(f, "{}", name)
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// No dataset found for the given string
    #[error("no dataset found for {0}")]
    Unknown(String),
}
