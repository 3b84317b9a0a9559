use std::io;

use async_trait::async_trait;
use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::{
    pipelines::token_classification,
    utils::{classes::label_set, files::read_lines},
};

use super::LoadableDataset;

/// The name of the UD AnCora dataset
pub static DATASET: &str = "ud-ancora";

/// The directory under `{data_dir}/datasets` holding the CoNLL-U files
static DATASET_DIR: &str = "ud_ancora";

const FORM: usize = 1;
const UPOS: usize = 3;

/// A sentence with a universal part-of-speech tag for each word
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Item {
    /// The words of the sentence
    pub words: Vec<String>,

    /// The UPOS tag of each word
    pub tags: Vec<String>,
}

impl token_classification::Item for Item {
    fn words(&self) -> &[String] {
        &self.words
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Struct for the UD AnCora dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

impl dataset::Dataset<Item> for Dataset {
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Dataset {
    /// Wrap already parsed sentences
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }
}

#[async_trait]
impl LoadableDataset<Item> for Dataset {
    /// Constructs the dataset for a mode (either "train" or "dev")
    async fn load(data_dir: &str, mode: &str) -> io::Result<Self> {
        let path = format!("{}/datasets/{}/{}.conllu", data_dir, DATASET_DIR, mode);
        let lines = read_lines(&path).await?;

        let items = parse_conllu(&lines)?;

        log::debug!("Read {} sentences from {}", items.len(), path);

        Ok(Self::from_items(items))
    }

    fn tags(&self) -> Vec<String> {
        let tags: Vec<String> = self.dataset.iter().flat_map(|item| item.tags).collect();

        label_set(&tags)
    }
}

/// Parse the word forms and UPOS tags out of CoNLL-U lines.
///
/// Comments are skipped, as are multiword tokens (`1-2`) and empty nodes (`1.1`), so each
/// sentence holds exactly the syntactic words. A blank line ends a sentence.
pub fn parse_conllu<S: AsRef<str>>(lines: &[S]) -> io::Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut words = Vec::new();
    let mut tags = Vec::new();

    for (number, line) in lines.iter().enumerate() {
        let line = line.as_ref().trim_end();

        if line.is_empty() {
            if !words.is_empty() {
                items.push(Item::new(
                    std::mem::take(&mut words),
                    std::mem::take(&mut tags),
                ));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() <= UPOS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "line {}: expected at least {} tab separated columns, found {}",
                    number + 1,
                    UPOS + 1,
                    columns.len()
                ),
            ));
        }

        let id = columns[0];
        if id.contains('-') || id.contains('.') {
            continue;
        }

        words.push(columns[FORM].to_string());
        tags.push(columns[UPOS].to_string());
    }

    if !words.is_empty() {
        items.push(Item::new(words, tags));
    }

    Ok(items)
}
