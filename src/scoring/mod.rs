//! Quality scoring
//!
//! Each language has its own classifier at `<dir>/filter_<lang>.bin`. A
//! document's score for a label is the line-length weighted mean of the
//! label's probability over the document's non-empty lines.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::models::{ModelError, ModelProvider, TextClassifier};
use crate::util::round_to;

/// Errors raised while scoring documents
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Language {0} is not configured for scoring")]
    UnsupportedLanguage(String),

    #[error("Scoring model for {lang}: {source}")]
    Model {
        lang: String,
        #[source]
        source: ModelError,
    },
}

/// Computes named quality scores for a document
pub trait ScoringProvider: Send {
    fn score(&mut self, text: &str, lang: &str) -> Result<BTreeMap<String, f64>, ScoringError>;
}

/// Loads a classifier from a local model file
pub type ClassifierLoader =
    Box<dyn Fn(&Path) -> Result<Arc<dyn TextClassifier>, ModelError> + Send + Sync>;

/// A loaded model plus its label count
struct Scorer {
    classifier: Arc<dyn TextClassifier>,
    n_labels: usize,
}

/// Per-language scoring models, loaded on first use
pub struct ScoringModels {
    models_dir: String,
    languages: Vec<String>,
    provider: Arc<dyn ModelProvider>,
    loader: ClassifierLoader,
    models: HashMap<String, Scorer>,
}

impl ScoringModels {
    pub fn new(
        models_dir: impl Into<String>,
        languages: Vec<String>,
        provider: Arc<dyn ModelProvider>,
        loader: ClassifierLoader,
    ) -> Self {
        Self {
            models_dir: models_dir.into(),
            languages,
            provider,
            loader,
            models: HashMap::new(),
        }
    }

    /// Model reference for a language
    pub fn model_reference(&self, lang: &str) -> String {
        format!("{}/filter_{}.bin", self.models_dir.trim_end_matches('/'), lang)
    }

    /// Load every configured language up front
    pub fn load_all(&mut self) -> Result<(), ScoringError> {
        for lang in self.languages.clone() {
            self.ensure_loaded(&lang)?;
        }
        Ok(())
    }

    /// Number of models currently in memory
    pub fn loaded_count(&self) -> usize {
        self.models.len()
    }

    fn ensure_loaded(&mut self, lang: &str) -> Result<&Scorer, ScoringError> {
        if !self.models.contains_key(lang) {
            let scorer = self.load(lang).map_err(|source| ScoringError::Model {
                lang: lang.to_string(),
                source,
            })?;
            self.models.insert(lang.to_string(), scorer);
        }
        self.models
            .get(lang)
            .ok_or_else(|| ScoringError::UnsupportedLanguage(lang.to_string()))
    }

    fn load(&self, lang: &str) -> Result<Scorer, ModelError> {
        let path = self.provider.ensure_local(&self.model_reference(lang))?;
        if !path.exists() {
            return Err(ModelError::NotFound(path));
        }
        info!(lang, path = %path.display(), "Loading scoring model");
        let classifier = (self.loader)(&path)?;
        let n_labels = classifier.labels()?.len();
        Ok(Scorer {
            classifier,
            n_labels,
        })
    }
}

impl ScoringProvider for ScoringModels {
    fn score(&mut self, text: &str, lang: &str) -> Result<BTreeMap<String, f64>, ScoringError> {
        if !self.languages.iter().any(|l| l == lang) {
            return Err(ScoringError::UnsupportedLanguage(lang.to_string()));
        }
        let scorer = self.ensure_loaded(lang)?;
        document_scores(scorer.classifier.as_ref(), scorer.n_labels, text).map_err(|source| {
            ScoringError::Model {
                lang: lang.to_string(),
                source,
            }
        })
    }
}

/// Line-length weighted label probabilities, rounded to 2 decimals.
///
/// Each non-empty line is classified with its trailing newline. Empty text
/// yields no scores.
pub fn document_scores(
    classifier: &dyn TextClassifier,
    n_labels: usize,
    text: &str,
) -> Result<BTreeMap<String, f64>, ModelError> {
    let mut weighted: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_len = 0usize;

    for line in text.split('\n').filter(|l| !l.is_empty()) {
        let line = format!("{}\n", line);
        for prediction in classifier.predict(&line, n_labels)? {
            *weighted.entry(prediction.label).or_insert(0.0) +=
                prediction.probability as f64 * line.len() as f64;
        }
        total_len += line.len();
    }

    if total_len == 0 {
        return Ok(BTreeMap::new());
    }
    Ok(weighted
        .into_iter()
        .map(|(label, sum)| (label, round_to(sum / total_len as f64, 2)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelStore, Prediction};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Scores lines containing "spam" as `rand`, everything else as `wiki`
    struct KeywordClassifier;

    impl TextClassifier for KeywordClassifier {
        fn predict(&self, text: &str, k: usize) -> Result<Vec<Prediction>, ModelError> {
            let rand = if text.contains("spam") { 1.0 } else { 0.0 };
            let preds = vec![
                Prediction { label: "rand".to_string(), probability: rand },
                Prediction { label: "wiki".to_string(), probability: 1.0 - rand },
            ];
            Ok(preds.into_iter().take(k).collect())
        }

        fn labels(&self) -> Result<Vec<String>, ModelError> {
            Ok(vec!["rand".to_string(), "wiki".to_string()])
        }
    }

    fn scoring_models(dir: &TempDir, languages: &[&str], loads: Arc<AtomicUsize>) -> ScoringModels {
        let store = ModelStore::new(Some(dir.path().join("cache")), "test").unwrap();
        ScoringModels::new(
            dir.path().to_string_lossy().to_string(),
            languages.iter().map(|l| l.to_string()).collect(),
            Arc::new(store),
            Box::new(move |_path: &Path| {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(KeywordClassifier) as Arc<dyn TextClassifier>)
            }),
        )
    }

    #[test]
    fn test_scores_are_weighted_by_line_length() {
        // "spam\n" is 5 bytes, "encyclopedia\n" is 13 bytes
        let scores = document_scores(&KeywordClassifier, 2, "spam\n\nencyclopedia").unwrap();
        assert_eq!(scores["rand"], 0.28);
        assert_eq!(scores["wiki"], 0.72);
    }

    #[test]
    fn test_empty_text_has_no_scores() {
        assert!(document_scores(&KeywordClassifier, 2, "\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_models_load_lazily_once_per_language() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("filter_en.bin"), b"x").unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let mut models = scoring_models(&dir, &["en", "fr"], loads.clone());

        assert_eq!(loads.load(Ordering::SeqCst), 0);
        models.score("some text", "en").unwrap();
        models.score("more text", "en").unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(models.loaded_count(), 1);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut models = scoring_models(&dir, &["fr"], Arc::new(AtomicUsize::new(0)));
        let err = models.score("texte", "fr").unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Model { source: ModelError::NotFound(_), .. }
        ));
    }

    #[test]
    fn test_unconfigured_language_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut models = scoring_models(&dir, &["en"], Arc::new(AtomicUsize::new(0)));
        assert!(matches!(
            models.score("texte", "fr"),
            Err(ScoringError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_load_all_loads_every_language() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("filter_en.bin"), b"x").unwrap();
        std::fs::write(dir.path().join("filter_de.bin"), b"x").unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let mut models = scoring_models(&dir, &["en", "de"], loads.clone());
        models.load_all().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
