//! Output, corpus, and worker configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Output artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<group>.<extension>` files
    pub destination: PathBuf,
    /// Artifact extension
    pub extension: String,
    /// zstd compression level
    pub compression_level: i32,
    /// Commit a group once every source reported, even if some failed.
    /// When false the group stays uncommitted and failed sources are retried next run.
    pub commit_with_failed_sources: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("corpus"),
            extension: "jsonl.zstd".to_string(),
            compression_level: 3,
            commit_with_failed_sources: true,
        }
    }
}

/// Which crawl to read and which groups to build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Crawl identifier, e.g. `CC-MAIN-2024-51`
    pub name: String,
    /// Base URL prepended to every archive path
    pub base_url: String,
    /// Read the archive listing from this file instead of downloading it
    pub paths_file: Option<PathBuf>,
    /// Group selection: `ALL`, `28`, `10-50`, or `1,8,13`
    pub groups: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            name: "CC-MAIN-2024-51".to_string(),
            base_url: "https://data.commoncrawl.org".to_string(),
            paths_file: None,
            groups: "ALL".to_string(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of parallel workers per group
    pub count: usize,
    /// Upper bound of the random delay before a worker's first fetch
    pub max_start_jitter_secs: u64,
    /// Capacity of the result channel
    pub result_buffer: usize,
    /// How long to wait for workers to exit after the last report
    pub shutdown_grace_secs: u64,
}

impl WorkerConfig {
    pub fn max_start_jitter(&self) -> Duration {
        Duration::from_secs(self.max_start_jitter_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 8,
            max_start_jitter_secs: 10,
            result_buffer: 1024,
            shutdown_grace_secs: 30,
        }
    }
}
