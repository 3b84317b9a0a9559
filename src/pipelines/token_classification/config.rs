use burn::optim::LearningRate;

use super::PIPELINE;

/// Define configuration struct for the experiment
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// The pretrained model to start from (e.g., "bert-base-multilingual-cased")
    #[config(default = "\"bert-base-multilingual-cased\".to_string()")]
    pub starter: String,

    /// The Dataset to use (e.g., "ud-ancora")
    #[config(default = "\"ud-ancora\".to_string()")]
    pub dataset_name: String,

    /// The registered architecture used to assemble the model
    #[config(default = "\"transformer_tagger.v1\".to_string()")]
    pub architecture: String,

    /// The registered optimizer
    #[config(default = "\"Adam.v1\".to_string()")]
    pub optimizer: String,

    /// Batch size
    #[config(default = 20)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 10)]
    pub n_epoch: usize,

    /// Number of batches whose gradients are accumulated before each optimizer step
    #[config(default = 4)]
    pub batch_per_update: usize,

    /// Learning rate
    #[config(default = 2e-5)]
    pub learn_rate: LearningRate,

    /// Batch size for evaluation
    #[config(default = 128)]
    pub eval_batch_size: usize,

    /// Maximum sequence length, boundary markers included
    #[config(default = 128)]
    pub max_seq_length: usize,

    /// Dropout rate
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Normalize predictions into probabilities
    #[config(default = true)]
    pub normalize_outputs: bool,

    /// Seed for shuffling and initialization
    #[config(default = 0)]
    pub seed: u64,

    /// The location of the top-level data directory
    #[config(default = "\"data\".to_string()")]
    pub data_dir: String,
}

impl Config {
    /// Where trained artifacts are stored for this configuration
    pub fn artifact_dir(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.data_dir, PIPELINE, self.dataset_name, self.starter
        )
    }

    /// Check the settings that cannot be expressed through types alone
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            return Err(anyhow!("The batch size must be at least 1"));
        }

        if self.batch_per_update == 0 {
            return Err(anyhow!("The number of batches per update must be at least 1"));
        }

        if self.eval_batch_size == 0 {
            return Err(anyhow!("The evaluation batch size must be at least 1"));
        }

        Ok(())
    }
}
