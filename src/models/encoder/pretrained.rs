use std::path::PathBuf;

use burn::tensor::backend::Backend;
use burn_store::{ModuleSnapshot, PyTorchToBurnAdapter, SafetensorsStore};

use super::Encoder;

/// Renames from Hugging Face BERT parameter paths to the paths of the [`Encoder`] module tree,
/// applied in order
const KEY_REMAPPINGS: &[(&str, &str)] = &[
    (r"^(bert|roberta)\.", ""),
    (r"^embeddings\.LayerNorm\.", "embeddings.layer_norm."),
    (
        r"^encoder\.layer\.(\d+)\.attention\.self\.(query|key|value)\.",
        "encoder.layers.$1.mha.$2.",
    ),
    (
        r"^encoder\.layer\.(\d+)\.attention\.output\.dense\.",
        "encoder.layers.$1.mha.output.",
    ),
    (
        r"^encoder\.layer\.(\d+)\.attention\.output\.LayerNorm\.",
        "encoder.layers.$1.norm_1.",
    ),
    (
        r"^encoder\.layer\.(\d+)\.intermediate\.dense\.",
        "encoder.layers.$1.pwff.linear_inner.",
    ),
    (
        r"^encoder\.layer\.(\d+)\.output\.dense\.",
        "encoder.layers.$1.pwff.linear_outer.",
    ),
    (
        r"^encoder\.layer\.(\d+)\.output\.LayerNorm\.",
        "encoder.layers.$1.norm_2.",
    ),
];

impl<B: Backend> Encoder<B> {
    /// Load pretrained weights from a Hugging Face `model.safetensors` file
    pub fn load_pretrained(mut self, weights: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let weights = weights.into();

        let mut store = KEY_REMAPPINGS.iter().fold(
            SafetensorsStore::from_file(weights.clone())
                .with_from_adapter(PyTorchToBurnAdapter)
                .allow_partial(true),
            |store, (from, to)| store.with_key_remapping(*from, *to),
        );

        let result = self.load_from(&mut store).map_err(|e| {
            anyhow!(
                "Unable to load pretrained weights from {}: {}",
                weights.display(),
                e
            )
        })?;

        if !result.errors.is_empty() {
            return Err(anyhow!(
                "Unable to apply pretrained weights from {}: {:?}",
                weights.display(),
                result.errors
            ));
        }

        if result.applied.is_empty() {
            return Err(anyhow!(
                "No pretrained weights in {} matched the encoder",
                weights.display()
            ));
        }

        log::info!(
            "Loaded {} pretrained tensors ({} missing, {} unused)",
            result.applied.len(),
            result.missing.len(),
            result.unused.len()
        );

        for (path, _) in &result.missing {
            log::warn!("No pretrained weights for {}", path);
        }

        Ok(self)
    }
}
