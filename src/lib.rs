//! # Burn Tagger
//!
//! Token classification on top of a transformer encoder, with a bridge that turns padded
//! encoder batches into per-sentence token vectors and back.
#![forbid(unsafe_code)]

/// Padded batch to per-item sequence conversion
pub mod bridge;

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Named architecture and optimizer factories
pub mod registry;

/// Utilities
pub mod utils;

/// CLI indexes and utilities
pub mod cli;

/// Error macros
#[macro_use]
extern crate anyhow;
