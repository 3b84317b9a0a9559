//! Named constructors for the pieces of a training run.
//!
//! A training configuration refers to its architecture and optimizer by string id. The
//! registries below map those ids to factory functions, and are resolved up front so that a
//! typo fails before any model is downloaded.

use std::collections::BTreeMap;

use burn::{
    grad_clipping::GradientClippingConfig,
    optim::{decay::WeightDecayConfig, AdamConfig, AdamWConfig},
};

use crate::{
    models::{encoder::EncoderConfig, TaggerConfig},
    pipelines::token_classification::Config,
};

/// A map from string ids to factory functions
#[derive(Debug, Clone)]
pub struct Registry<F> {
    kind: &'static str,
    entries: BTreeMap<&'static str, F>,
}

impl<F: Copy> Registry<F> {
    /// Create an empty registry for the given kind of component
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Register a factory under a name
    pub fn register(mut self, name: &'static str, factory: F) -> Self {
        self.entries.insert(name, factory);
        self
    }

    /// Look up the factory registered under a name
    pub fn get(&self, name: &str) -> Result<F, RegistryError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::Unknown {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    /// The registered names, in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }
}

/// Registry Error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Nothing is registered under the requested name
    #[error("no {kind} registered for {name}")]
    Unknown {
        /// The kind of component requested
        kind: &'static str,

        /// The requested name
        name: String,
    },
}

/// Assembles a tagger configuration from an encoder configuration and a tag set
pub type ArchitectureFactory = fn(EncoderConfig, Vec<String>, &Config) -> TaggerConfig;

/// The available architectures
pub fn architectures() -> Registry<ArchitectureFactory> {
    Registry::<ArchitectureFactory>::new("architecture")
        .register("transformer_tagger.v1", transformer_tagger)
}

fn transformer_tagger(encoder: EncoderConfig, tags: Vec<String>, config: &Config) -> TaggerConfig {
    TaggerConfig::new(
        encoder.with_hidden_dropout_prob(config.hidden_dropout_prob),
        tags,
    )
    .with_normalize_outputs(config.normalize_outputs)
}

/// An optimizer configuration chosen through the registry
#[derive(Debug)]
pub enum OptimizerConfig {
    /// Adam with L2 weight decay
    Adam(AdamConfig),

    /// Adam with decoupled weight decay
    AdamW(AdamWConfig),
}

/// Builds an optimizer configuration
pub type OptimizerFactory = fn(&Config) -> OptimizerConfig;

/// The available optimizers
pub fn optimizers() -> Registry<OptimizerFactory> {
    Registry::<OptimizerFactory>::new("optimizer")
        .register("Adam.v1", adam)
        .register("AdamW.v1", adamw)
}

fn adam(_config: &Config) -> OptimizerConfig {
    OptimizerConfig::Adam(
        AdamConfig::new()
            .with_epsilon(1e-8)
            .with_weight_decay(Some(WeightDecayConfig::new(1e-6)))
            .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0))),
    )
}

fn adamw(_config: &Config) -> OptimizerConfig {
    OptimizerConfig::AdamW(
        AdamWConfig::new()
            .with_epsilon(1e-8)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0))),
    )
}

/// Resolve the architecture and optimizer named by a configuration
pub fn resolve(config: &Config) -> Result<(ArchitectureFactory, OptimizerFactory), RegistryError> {
    Ok((
        architectures().get(&config.architecture)?,
        optimizers().get(&config.optimizer)?,
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_unknown_name() {
        let err = optimizers().get("SGD.v1").unwrap_err();

        assert_eq!(
            err,
            RegistryError::Unknown {
                kind: "optimizer",
                name: "SGD.v1".to_string()
            }
        );
        assert_eq!(err.to_string(), "no optimizer registered for SGD.v1");
    }

    #[test]
    fn test_names() {
        assert_eq!(optimizers().names(), vec!["Adam.v1", "AdamW.v1"]);
        assert_eq!(architectures().names(), vec!["transformer_tagger.v1"]);
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Config::new().with_hidden_dropout_prob(0.2);
        let (architecture, optimizer) = resolve(&config).unwrap();

        let tagger = architecture(
            EncoderConfig::new(10, 4, 1, 1, 8, 16),
            vec!["DET".to_string()],
            &config,
        );
        assert_eq!(tagger.encoder.hidden_dropout_prob, 0.2);
        assert_eq!(tagger.n_tags(), 1);

        assert!(matches!(optimizer(&config), OptimizerConfig::Adam(_)));
    }

    #[test]
    fn test_every_optimizer_builds() {
        let config = Config::new();

        let adam = optimizers().get("Adam.v1").unwrap();
        let adamw = optimizers().get("AdamW.v1").unwrap();

        assert!(matches!(adam(&config), OptimizerConfig::Adam(_)));
        assert!(matches!(adamw(&config), OptimizerConfig::AdamW(_)));
    }

    #[test]
    fn test_resolve_unknown_architecture() {
        let config = Config::new().with_architecture("lstm_tagger.v1".to_string());

        assert!(resolve(&config).is_err());
    }
}
