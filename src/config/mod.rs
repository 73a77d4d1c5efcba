//! Configuration for warcsift

mod fetch;
mod filter;
mod logging;
mod pipeline;

pub use fetch::FetchConfig;
pub use filter::{FilterConfig, ModelsConfig, DEFAULT_LANGUAGES};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use pipeline::{CorpusConfig, OutputConfig, WorkerConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for archive and model downloads
pub const DEFAULT_USER_AGENT: &str = concat!("warcsift/", env!("CARGO_PKG_VERSION"));

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "warcsift.toml";

/// Main configuration for a corpus build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output artifacts and commit behaviour
    #[serde(default)]
    pub output: OutputConfig,
    /// Which crawl and which groups to build
    #[serde(default)]
    pub corpus: CorpusConfig,
    /// Worker pool sizing
    #[serde(default)]
    pub workers: WorkerConfig,
    /// Archive download behaviour
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Record and document filters
    #[serde(default)]
    pub filter: FilterConfig,
    /// Model locations
    #[serde(default)]
    pub models: ModelsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults.
    ///
    /// Validation is deferred so command-line overrides can be applied first.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))
    }

    /// Render as TOML, used by `warcsift init`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Output validation
        if self.output.destination.as_os_str().is_empty() {
            errors.push("output destination must not be empty".to_string());
        }
        if self.output.extension.trim().is_empty() {
            errors.push("output extension must not be empty".to_string());
        }
        if !(1..=22).contains(&self.output.compression_level) {
            errors.push(format!(
                "compression_level must be between 1 and 22, got {}",
                self.output.compression_level
            ));
        }

        // Corpus validation
        if self.corpus.name.trim().is_empty() && self.corpus.paths_file.is_none() {
            errors.push("either corpus name or paths_file must be set".to_string());
        }

        // Worker validation
        if self.workers.count == 0 {
            errors.push("worker count must be positive".to_string());
        }
        if self.workers.result_buffer == 0 {
            errors.push("result_buffer must be positive".to_string());
        }

        // Fetch validation
        if self.fetch.attempts == 0 {
            errors.push("fetch attempts must be positive".to_string());
        }
        if self.fetch.connect_timeout_secs == 0 || self.fetch.read_timeout_secs == 0 {
            errors.push("fetch timeouts must be positive".to_string());
        }

        // Filter validation
        if self.filter.languages.is_empty() {
            errors.push("language list is empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.filter.min_bloom_threshold) {
            errors.push("min_bloom_threshold must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.filter.max_rand_score) {
            errors.push("max_rand_score must be between 0.0 and 1.0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

/// Treat the literal `none` (any case) or an empty string as "disabled"
pub fn optional_reference(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ========================================================================
    // Config::validate
    // ========================================================================

    #[test]
    fn default_config_passes_validation() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn validate_rejects_empty_language_list() {
        let mut cfg = Config::default();
        cfg.filter.languages.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("language list is empty"), "{}", err);
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut cfg = Config::default();
        cfg.workers.count = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("worker count must be positive"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = Config::default();
        cfg.workers.count = 0;
        cfg.fetch.attempts = 0;
        cfg.filter.max_rand_score = 1.5;
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("worker count"));
        assert!(msg.contains("fetch attempts"));
        assert!(msg.contains("max_rand_score"));
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("warcsift.toml");
        std::fs::write(
            &path,
            r#"
[filter]
min_length = 200
languages = ["fr", "de"]

[workers]
count = 2
"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.filter.min_length, 200);
        assert_eq!(cfg.filter.languages, vec!["fr".to_string(), "de".to_string()]);
        assert_eq!(cfg.workers.count, 2);
        assert_eq!(cfg.fetch.attempts, 3);
        assert_eq!(cfg.output.extension, "jsonl.zstd");
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg.workers.count, 8);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.corpus.name, "CC-MAIN-2024-51");
        assert_eq!(parsed.filter.languages.len(), DEFAULT_LANGUAGES.len());
    }

    #[test]
    fn optional_reference_handles_none() {
        assert_eq!(optional_reference("none"), None);
        assert_eq!(optional_reference("NONE"), None);
        assert_eq!(optional_reference("  "), None);
        assert_eq!(optional_reference("bloom.bin"), Some("bloom.bin".to_string()));
    }
}
