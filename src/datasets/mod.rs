use async_trait::async_trait;

/// The UD Spanish AnCora treebank
pub mod ud_ancora;

/// Synthetic tagging data
pub mod dummy;

/// A datates which can be loaded
#[async_trait]
pub trait LoadableDataset<I>: burn::data::dataset::Dataset<I> {
    /// Load the dataset
    async fn load(data_dir: &str, mode: &str) -> std::io::Result<Self>
    where
        Self: std::marker::Sized;

    /// The distinct tags used by the dataset, in sorted order
    fn tags(&self) -> Vec<String>;
}
