//! warcsift: resumable, parallel corpus builder for web-archive crawls
//!
//! Builds a filtered, deduplicated text corpus from WARC archives:
//! - Archive catalog resolution into numbered groups
//! - Parallel worker pool streaming and classifying archive records
//! - Language identification, paragraph dedup, and quality scoring
//! - Crash-safe, resumable output commits (temp → old → final)

pub mod catalog;
pub mod config;
pub mod dedup;
pub mod extract;
pub mod language;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod types;
pub mod util;
pub mod warc;

pub use config::Config;
pub use types::*;
