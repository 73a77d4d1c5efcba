//! Core types shared by the pipeline stages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of an archive source (its fetch URL or local path)
pub type SourceId = String;

// ============================================================================
// Output Documents
// ============================================================================

/// A candidate output record, one JSON line in a group's output artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted main text
    pub text: String,
    /// Capture timestamp (`WARC-Date`)
    pub date: String,
    /// Captured URL (`WARC-Target-URI`)
    pub url: String,
    /// Detected language code
    pub language: String,
    /// Language confidence, rounded to 3 decimals
    pub language_score: f64,
    /// Archive record id (`WARC-Record-ID`)
    #[serde(rename = "warc-id", alias = "warc_id")]
    pub warc_id: String,
    /// Named quality scores, rounded to 3 decimals
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    /// Group this document belongs to
    pub group_idx: usize,
    /// Archive source the record was read from
    pub warc_file: SourceId,
    /// 0-based index of the record within its source
    pub record_idx: u64,
    /// Repeated-window ratio, filled in by the filter chain
    #[serde(default)]
    pub repetitions: Option<f64>,
    /// Long-word ratio, filled in by the filter chain
    #[serde(default)]
    pub long_words: Option<f64>,
}

impl Document {
    /// Serialize as a single JSON line (without the trailing newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse one JSON line produced by [`Document::to_json_line`]
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

// ============================================================================
// Worker Results
// ============================================================================

/// Per-source outcome, emitted exactly once for every source handed to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveCompletionReport {
    /// Source this report describes
    pub source: SourceId,
    /// Whether every record of the source was consumed without a stream error
    pub success: bool,
    /// Records read from the stream, including skipped ones
    pub total_records: u64,
    /// Records skipped as already done or turned into documents
    pub processed_records: u64,
    /// Records rejected by classification
    pub failed_records: u64,
}

impl ArchiveCompletionReport {
    /// Report for a source that was already finished in a previous run
    pub fn already_done(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
            success: true,
            total_records: 0,
            processed_records: 0,
            failed_records: 0,
        }
    }
}

/// Everything a worker can send back to the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// A classified record, still subject to the filter chain
    Document(Document),
    /// The final report for one source
    Completed(ArchiveCompletionReport),
}
