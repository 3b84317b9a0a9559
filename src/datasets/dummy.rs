use std::io;

use async_trait::async_trait;
use burn::data::dataset::{self, Dataset as _, InMemDataset};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{ud_ancora::Item, LoadableDataset};

/// The name of the dummy dataset
pub static DATASET: &str = "dummy";

/// Shape of the generated data
#[derive(burn::config::Config, Debug)]
pub struct DummyConfig {
    /// Number of sentences
    #[config(default = 1000)]
    pub n_samples: usize,

    /// Number of distinct tags
    #[config(default = 20)]
    pub n_tags: usize,

    /// Number of distinct words
    #[config(default = 10000)]
    pub n_vocab: usize,

    /// Mean sentence length, in words
    #[config(default = 50)]
    pub length_mean: usize,

    /// Sentence lengths are drawn uniformly within this distance of the mean
    #[config(default = 5)]
    pub length_variance: usize,
}

impl DummyConfig {
    /// Every word the generator can produce
    pub fn vocab(&self) -> Vec<String> {
        (0..self.n_vocab).map(word).collect()
    }
}

fn word(id: usize) -> String {
    format!("w{}", id)
}

fn tag(id: usize) -> String {
    format!("T{}", id)
}

/// Derive a generator seed from the mode, so that train and dev differ but repeat across runs
fn mode_seed(mode: &str) -> u64 {
    mode.bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64))
}

/// Randomly generated sentences with random tags
pub struct Dataset {
    dataset: InMemDataset<Item>,
    n_tags: usize,
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
    /// Generate the sentences for a mode
    pub fn generate(config: &DummyConfig, mode: &str) -> Self {
        let mut rng = StdRng::seed_from_u64(mode_seed(mode));

        let min = usize::max(config.length_mean.saturating_sub(config.length_variance), 1);
        let max = usize::max(config.length_mean + config.length_variance, min);

        let n_vocab = config.n_vocab.max(1);
        let n_tags = config.n_tags.max(1);

        let items = (0..config.n_samples)
            .map(|_| {
                let length = rng.gen_range(min..=max);

                let words = (0..length).map(|_| word(rng.gen_range(0..n_vocab))).collect();
                let tags = (0..length).map(|_| tag(rng.gen_range(0..n_tags))).collect();

                Item::new(words, tags)
            })
            .collect();

        Self {
            dataset: InMemDataset::new(items),
            n_tags,
        }
    }
}

#[async_trait]
impl LoadableDataset<Item> for Dataset {
    /// Generates the dataset with the default shape. Nothing is read from `data_dir`.
    async fn load(_data_dir: &str, mode: &str) -> io::Result<Self> {
        Ok(Self::generate(&DummyConfig::new(), mode))
    }

    /// All configured tags, whether or not they were drawn
    fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = (0..self.n_tags).map(tag).collect();
        tags.sort();
        tags
    }
}

#[cfg(test)]
mod tests {
    use burn::data::dataset::Dataset as _;
    use pretty_assertions::assert_eq;

    use super::*;

    fn small() -> DummyConfig {
        DummyConfig::new()
            .with_n_samples(10)
            .with_n_tags(3)
            .with_n_vocab(50)
            .with_length_mean(4)
            .with_length_variance(2)
    }

    #[test]
    fn test_generation_is_deterministic() {
        let first = Dataset::generate(&small(), "train");
        let second = Dataset::generate(&small(), "train");

        assert_eq!(first.iter().collect::<Vec<_>>(), second.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_modes_differ() {
        let train = Dataset::generate(&small(), "train");
        let dev = Dataset::generate(&small(), "dev");

        assert_ne!(train.iter().collect::<Vec<_>>(), dev.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_shape() {
        let config = small();
        let dataset = Dataset::generate(&config, "train");

        assert_eq!(dataset.len(), 10);

        let vocab = config.vocab();
        for item in dataset.iter() {
            assert!((2..=6).contains(&item.words.len()));
            assert_eq!(item.words.len(), item.tags.len());
            assert!(item.words.iter().all(|w| vocab.contains(w)));
        }

        assert_eq!(dataset.tags(), vec!["T0", "T1", "T2"]);
    }

    #[test]
    fn test_minimum_length() {
        let config = small().with_length_mean(1).with_length_variance(3);
        let dataset = Dataset::generate(&config, "train");

        assert!(dataset.iter().all(|item| !item.words.is_empty()));
    }
}
