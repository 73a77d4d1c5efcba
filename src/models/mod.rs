//! Model files and text classifiers
//!
//! - [`ModelStore`] turns a model reference (local path, URL, or hub
//!   reference) into a local file, downloading and caching as needed.
//! - [`TextClassifier`] is the seam for supervised text classifiers; the
//!   fastText backend sits behind the `fasttext` cargo feature.

mod classifier;
#[cfg(feature = "fasttext")]
mod fasttext_backend;
mod store;

pub use classifier::{load_classifier, strip_label, Prediction, TextClassifier, LABEL_PREFIX};
#[cfg(feature = "fasttext")]
pub use fasttext_backend::FastTextClassifier;
pub use store::{ModelLocation, ModelStore};

use std::path::PathBuf;
use thiserror::Error;

/// Turns a model reference into a local file path
pub trait ModelProvider: Send + Sync {
    fn ensure_local(&self, reference: &str) -> Result<PathBuf, ModelError>;
}

impl ModelProvider for ModelStore {
    fn ensure_local(&self, reference: &str) -> Result<PathBuf, ModelError> {
        ModelStore::ensure_local(self, reference)
    }
}

/// Errors resolving, downloading, loading, or running models
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Invalid model reference: {0}")]
    InvalidReference(String),

    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load model {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    #[error("Prediction failed: {0}")]
    Predict(String),

    #[error("No classifier backend compiled in (enable the `fasttext` feature)")]
    BackendUnavailable,
}
