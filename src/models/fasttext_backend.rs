//! fastText classifier backend

use fasttext::FastText;
use std::path::Path;

use super::{strip_label, ModelError, Prediction, TextClassifier};

/// fastText model shared between worker threads.
///
/// `predict` and `labels` take `&self` and run without a lock.
pub struct FastTextClassifier {
    model: FastText,
}

impl FastTextClassifier {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let load_error = |message: String| ModelError::Load {
            path: path.to_path_buf(),
            message,
        };
        let path_str = path
            .to_str()
            .ok_or_else(|| load_error("path is not valid UTF-8".to_string()))?;

        let mut model = FastText::new();
        model.load_model(path_str).map_err(load_error)?;
        Ok(Self { model })
    }
}

impl TextClassifier for FastTextClassifier {
    fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, ModelError> {
        let predictions = self
            .model
            .predict(text, k as i32, 0.0)
            .map_err(ModelError::Predict)?;
        Ok(predictions
            .into_iter()
            .map(|p| Prediction {
                label: strip_label(&p.label).to_string(),
                probability: p.prob,
            })
            .collect())
    }

    fn labels(&self) -> Result<Vec<String>, ModelError> {
        let (labels, _) = self.model.get_labels().map_err(ModelError::Predict)?;
        Ok(labels.iter().map(|l| strip_label(l).to_string()).collect())
    }
}
