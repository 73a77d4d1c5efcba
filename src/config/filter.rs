//! Filter and model configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Languages kept by default (official EU languages)
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "ga", "hr", "hu", "it", "lt",
    "lv", "mt", "nl", "pl", "pt", "ro", "sk", "sl", "sv",
];

/// Record and document filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Drop texts of at most this many characters
    pub min_length: usize,
    /// Allowed language codes
    pub languages: Vec<String>,
    /// Bloom filter reference for paragraph dedup (`none` disables)
    pub bloom_filter: Option<String>,
    /// Keep paragraphs whose novel fraction is above this threshold
    pub min_bloom_threshold: f64,
    /// Directory reference holding `filter_<lang>.bin` scoring models (`none` disables)
    pub scoring_models: Option<String>,
    /// Drop documents whose `rand` score exceeds this value
    pub max_rand_score: f64,
    /// Load every scoring model before the first group starts
    pub load_models_early: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_length: 500,
            languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            bloom_filter: None,
            min_bloom_threshold: 0.2,
            scoring_models: None,
            max_rand_score: 0.9,
            load_models_early: false,
        }
    }
}

/// Model location configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Language identification model reference (path, URL, or `hf://` reference)
    pub language_detector: String,
    /// Where downloaded models are cached (platform cache dir when unset)
    pub cache_dir: Option<PathBuf>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            language_detector:
                "https://dl.fbaipublicfiles.com/fasttext/supervised-models/lid.176.bin".to_string(),
            cache_dir: None,
        }
    }
}
