//! Document filter chain: dedup rewrite, metrics, quality scoring

use super::metrics::{long_word_ratio, repetition_ratio, LONG_WORD_LENGTH, REPETITION_WINDOW};
use crate::config::FilterConfig;
use crate::dedup::Deduplicator;
use crate::scoring::{ScoringError, ScoringProvider};
use crate::types::Document;
use crate::util::round_to;

/// Score compared against `max_rand_score`
pub const RAND_SCORE: &str = "rand";

/// Thresholds used by the chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub min_length: usize,
    pub min_bloom_threshold: f64,
    pub max_rand_score: f64,
}

impl From<&FilterConfig> for FilterSettings {
    fn from(config: &FilterConfig) -> Self {
        Self {
            min_length: config.min_length,
            min_bloom_threshold: config.min_bloom_threshold,
            max_rand_score: config.max_rand_score,
        }
    }
}

/// Result of running one document through the chain
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Write this document
    Accepted(Document),
    /// Dedup left fewer than `min_length` characters
    TooShortAfterDedup(usize),
    /// The `rand` score is above the maximum
    RandScoreTooHigh(f64),
}

/// Filters applied to every classified document before it is written
pub struct FilterChain<'a> {
    settings: FilterSettings,
    dedup: Option<Box<dyn Deduplicator>>,
    scorer: Option<&'a mut dyn ScoringProvider>,
}

impl<'a> FilterChain<'a> {
    pub fn new(
        settings: FilterSettings,
        dedup: Option<Box<dyn Deduplicator>>,
        scorer: Option<&'a mut dyn ScoringProvider>,
    ) -> Self {
        Self {
            settings,
            dedup,
            scorer,
        }
    }

    /// Run `document` through every stage.
    ///
    /// Scoring errors (a missing model for the document's language) are
    /// returned rather than treated as a rejection.
    pub fn apply(&mut self, mut document: Document) -> Result<FilterOutcome, ScoringError> {
        if let Some(dedup) = self.dedup.as_mut() {
            document.text = dedup.rewrite(&document.text, self.settings.min_bloom_threshold);
            let length = document.text.chars().count();
            if length < self.settings.min_length {
                return Ok(FilterOutcome::TooShortAfterDedup(length));
            }
        }

        document.repetitions = Some(repetition_ratio(&document.text, REPETITION_WINDOW));
        document.long_words = Some(long_word_ratio(&document.text, LONG_WORD_LENGTH));

        if let Some(scorer) = self.scorer.as_mut() {
            let scores = scorer.score(&document.text, &document.language)?;
            let rand = scores.get(RAND_SCORE).copied().unwrap_or(0.0);
            if rand > self.settings.max_rand_score {
                return Ok(FilterOutcome::RandScoreTooHigh(rand));
            }
            document.scores = scores
                .into_iter()
                .map(|(name, value)| (name, round_to(value, 3)))
                .collect();
        }

        Ok(FilterOutcome::Accepted(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FixedScorer(f64);

    impl ScoringProvider for FixedScorer {
        fn score(&mut self, _text: &str, lang: &str) -> Result<BTreeMap<String, f64>, ScoringError> {
            if lang != "en" {
                return Err(ScoringError::UnsupportedLanguage(lang.to_string()));
            }
            Ok(BTreeMap::from([
                (RAND_SCORE.to_string(), self.0),
                ("wikipedia".to_string(), 0.123456),
            ]))
        }
    }

    /// Drops every paragraph containing "dup"
    struct KeywordDedup;

    impl Deduplicator for KeywordDedup {
        fn rewrite(&mut self, text: &str, _threshold: f64) -> String {
            text.split("\n\n")
                .filter(|p| !p.contains("dup"))
                .map(|p| format!("{}\n\n", p))
                .collect()
        }
    }

    fn document(text: &str) -> Document {
        Document {
            text: text.to_string(),
            date: "2024-12-01T00:00:00Z".to_string(),
            url: "https://example.com/".to_string(),
            language: "en".to_string(),
            language_score: 0.9,
            warc_id: "<urn:uuid:1>".to_string(),
            scores: BTreeMap::new(),
            group_idx: 0,
            warc_file: "a.warc.gz".to_string(),
            record_idx: 0,
            repetitions: None,
            long_words: None,
        }
    }

    fn settings() -> FilterSettings {
        FilterSettings {
            min_length: 10,
            min_bloom_threshold: 0.2,
            max_rand_score: 0.9,
        }
    }

    #[test]
    fn test_metrics_are_always_attached() {
        let mut chain = FilterChain::new(settings(), None, None);
        let FilterOutcome::Accepted(doc) = chain.apply(document("plain text here")).unwrap() else {
            panic!("document should be accepted");
        };
        assert_eq!(doc.repetitions, Some(0.0));
        assert_eq!(doc.long_words, Some(0.0));
        assert!(doc.scores.is_empty());
    }

    #[test]
    fn test_dedup_can_drop_short_remainder() {
        let mut chain = FilterChain::new(settings(), Some(Box::new(KeywordDedup)), None);
        let outcome = chain.apply(document("short\n\ndup paragraph that is long")).unwrap();
        assert!(matches!(outcome, FilterOutcome::TooShortAfterDedup(_)));

        let FilterOutcome::Accepted(doc) = chain
            .apply(document("a long enough paragraph\n\ndup"))
            .unwrap()
        else {
            panic!("document should be accepted");
        };
        assert_eq!(doc.text, "a long enough paragraph\n\n");
    }

    #[test]
    fn test_high_rand_score_is_dropped() {
        let mut scorer = FixedScorer(0.95);
        let mut chain = FilterChain::new(settings(), None, Some(&mut scorer));
        assert_eq!(
            chain.apply(document("some text")).unwrap(),
            FilterOutcome::RandScoreTooHigh(0.95)
        );
    }

    #[test]
    fn test_scores_are_rounded_and_attached() {
        let mut scorer = FixedScorer(0.5);
        let mut chain = FilterChain::new(settings(), None, Some(&mut scorer));
        let FilterOutcome::Accepted(doc) = chain.apply(document("some text")).unwrap() else {
            panic!("document should be accepted");
        };
        assert_eq!(doc.scores.get("wikipedia"), Some(&0.123));
        assert_eq!(doc.scores.get(RAND_SCORE), Some(&0.5));
    }

    #[test]
    fn test_scoring_error_is_propagated() {
        let mut scorer = FixedScorer(0.1);
        let mut chain = FilterChain::new(settings(), None, Some(&mut scorer));
        let mut doc = document("texte");
        doc.language = "fr".to_string();
        assert!(chain.apply(doc).is_err());
    }
}
