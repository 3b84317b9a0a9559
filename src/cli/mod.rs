/// CLI Indexes: Datasets
pub mod datasets;

/// CLI Indexes: Starter models
pub mod models;
