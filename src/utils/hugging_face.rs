use std::path::PathBuf;

use hf_hub::api::tokio::{Api, ApiRepo};

/// Paths to the files needed to start from a pretrained Hugging Face model
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// The model's `config.json`
    pub config: PathBuf,

    /// The model's `model.safetensors` weights
    pub weights: PathBuf,

    /// The model's `tokenizer.json`
    pub tokenizer: PathBuf,
}

/// Download model config, weights and tokenizer from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
// NOTE: Modified from the built-in function to work within an already-async context
pub async fn download_hf_model(model_name: &str) -> anyhow::Result<ModelFiles> {
    let api =
        Api::new().map_err(|e| anyhow!("Unable to initialize the Hugging Face Hub API: {}", e))?;
    let repo = api.model(model_name.to_string());

    Ok(ModelFiles {
        config: fetch(&repo, model_name, "config.json").await?,
        weights: fetch(&repo, model_name, "model.safetensors").await?,
        tokenizer: fetch(&repo, model_name, "tokenizer.json").await?,
    })
}

async fn fetch(repo: &ApiRepo, model_name: &str, file: &str) -> anyhow::Result<PathBuf> {
    log::debug!("Fetching {} for {}", file, model_name);

    repo.get(file).await.map_err(|e| {
        anyhow!(
            "Failed to download: {} file with name: {} from HuggingFace Hub: {}",
            model_name,
            file,
            e
        )
    })
}
