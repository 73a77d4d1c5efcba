//! Language identification

use std::sync::Arc;

use crate::models::{ModelError, TextClassifier};

/// Top language label for a text
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    /// Language code, label prefix removed
    pub label: String,
    /// Raw model probability
    pub confidence: f64,
}

/// Predicts the language of a text
pub trait LanguageDetector: Send + Sync {
    fn predict(&self, text: &str) -> Result<LanguageGuess, ModelError>;

    /// Every language code the detector can return
    fn languages(&self) -> Result<Vec<String>, ModelError>;
}

/// Language detector backed by a supervised classifier (e.g. fastText `lid.176`)
pub struct ClassifierLanguageDetector {
    classifier: Arc<dyn TextClassifier>,
}

impl ClassifierLanguageDetector {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }
}

impl LanguageDetector for ClassifierLanguageDetector {
    fn predict(&self, text: &str) -> Result<LanguageGuess, ModelError> {
        // The classifier works on a single line
        let single_line = text.replace('\n', " ");
        let top = self
            .classifier
            .predict(&single_line, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Predict("classifier returned no label".to_string()))?;
        Ok(LanguageGuess {
            label: top.label,
            confidence: top.probability as f64,
        })
    }

    fn languages(&self) -> Result<Vec<String>, ModelError> {
        self.classifier.labels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prediction;
    use std::sync::{Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    struct RecordingClassifier {
        seen: Mutex<Vec<String>>,
    }

    impl TextClassifier for RecordingClassifier {
        fn predict(&self, text: &str, _k: usize) -> Result<Vec<Prediction>, ModelError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(vec![Prediction {
                label: "fr".to_string(),
                probability: 0.75,
            }])
        }

        fn labels(&self) -> Result<Vec<String>, ModelError> {
            Ok(vec!["fr".to_string(), "en".to_string()])
        }
    }

    #[test]
    fn test_newlines_are_flattened_before_prediction() {
        let classifier = Arc::new(RecordingClassifier {
            seen: Mutex::new(Vec::new()),
        });
        let detector = ClassifierLanguageDetector::new(classifier.clone());

        let guess = detector.predict("ligne un\nligne deux").unwrap();
        assert_eq!(guess.label, "fr");
        assert_eq!(guess.confidence, 0.75);
        assert_eq!(classifier.seen.lock().unwrap()[0], "ligne un ligne deux");
        assert_eq!(detector.languages().unwrap().len(), 2);
    }

    /// Blocks every predict until `parties` calls are inside at the same time
    struct RendezvousClassifier {
        barrier: Barrier,
    }

    impl TextClassifier for RendezvousClassifier {
        fn predict(&self, _text: &str, _k: usize) -> Result<Vec<Prediction>, ModelError> {
            self.barrier.wait();
            Ok(vec![Prediction {
                label: "en".to_string(),
                probability: 0.9,
            }])
        }

        fn labels(&self) -> Result<Vec<String>, ModelError> {
            Ok(vec!["en".to_string()])
        }
    }

    #[test]
    fn test_predictions_run_concurrently() {
        let detector = Arc::new(ClassifierLanguageDetector::new(Arc::new(RendezvousClassifier {
            barrier: Barrier::new(3),
        })));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let detector = Arc::clone(&detector);
                thread::spawn(move || detector.predict(&format!("text {}", i)))
            })
            .collect();

        // Serialized predicts would never reach the barrier together
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while !handles.iter().all(|h| h.is_finished()) {
            assert!(std::time::Instant::now() < deadline, "predictions were serialized");
            thread::sleep(Duration::from_millis(10));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap().label, "en");
        }
    }
}
