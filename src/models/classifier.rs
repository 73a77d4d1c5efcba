//! Text classifier seam

use std::path::Path;
use std::sync::Arc;

use super::ModelError;

/// Prefix carried by supervised classifier labels
pub const LABEL_PREFIX: &str = "__label__";

/// One predicted label with its probability
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Label with the classifier prefix removed
    pub label: String,
    pub probability: f32,
}

/// Supervised text classifier (language identification, quality scoring)
pub trait TextClassifier: Send + Sync {
    /// Top `k` predictions for one line of text, most probable first
    fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, ModelError>;

    /// Every label the model knows, prefix removed
    fn labels(&self) -> Result<Vec<String>, ModelError>;
}

/// Remove the label prefix if present
pub fn strip_label(label: &str) -> &str {
    label.strip_prefix(LABEL_PREFIX).unwrap_or(label)
}

/// Load a classifier from a local model file with the compiled-in backend
pub fn load_classifier(path: &Path) -> Result<Arc<dyn TextClassifier>, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }
    #[cfg(feature = "fasttext")]
    {
        Ok(Arc::new(super::FastTextClassifier::load(path)?))
    }
    #[cfg(not(feature = "fasttext"))]
    {
        Err(ModelError::BackendUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_label() {
        assert_eq!(strip_label("__label__en"), "en");
        assert_eq!(strip_label("rand"), "rand");
    }

    #[test]
    fn test_missing_model_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load_classifier(&dir.path().join("missing.bin"));
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }
}
