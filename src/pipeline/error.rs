//! Pipeline errors

use std::path::PathBuf;
use thiserror::Error;

use super::fetcher::FetchError;
use crate::catalog::CatalogError;
use crate::dedup::DedupError;
use crate::models::ModelError;
use crate::scoring::ScoringError;

/// Errors raised while building a group
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt progress file {}: {source}", .path.display())]
    Progress {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Dedup error: {0}")]
    Dedup(#[from] DedupError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    /// Errors that make every remaining group pointless to attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Model(_) | Self::Scoring(_) | Self::Catalog(_) | Self::Dedup(_) | Self::Config(_)
        )
    }
}
