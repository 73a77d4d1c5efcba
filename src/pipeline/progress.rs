//! Per-group progress checkpoint
//!
//! Maps each archive source to the last record index written to the output
//! and whether the source finished. Only the orchestrator mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::PipelineError;
use crate::types::SourceId;

fn no_record_seen() -> i64 {
    -1
}

/// Progress within one archive source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarcRecordProgress {
    /// Index of the last record already written (-1 = none)
    #[serde(default = "no_record_seen")]
    pub last_record_seen: i64,
    /// No further records will be processed for this source
    #[serde(default)]
    pub done: bool,
}

impl Default for WarcRecordProgress {
    fn default() -> Self {
        Self {
            last_record_seen: no_record_seen(),
            done: false,
        }
    }
}

impl WarcRecordProgress {
    /// Whether the record at `idx` was already handled in a previous run
    pub fn covers(&self, idx: u64) -> bool {
        self.last_record_seen >= 0 && idx as i64 <= self.last_record_seen
    }
}

/// Durable progress for one group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStore {
    persistent_path: PathBuf,
    warcs_progress: BTreeMap<SourceId, WarcRecordProgress>,
}

impl ProgressStore {
    /// Empty progress persisted at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            persistent_path: path.into(),
            warcs_progress: BTreeMap::new(),
        }
    }

    /// Load progress from `path`, or start empty if the file does not exist
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Ok(Self::new(path));
        }
        let content = fs::read_to_string(path)?;
        let mut store: ProgressStore =
            serde_json::from_str(&content).map_err(|source| PipelineError::Progress {
                path: path.to_path_buf(),
                source,
            })?;
        // The file may have been moved since it was written
        store.persistent_path = path.to_path_buf();
        Ok(store)
    }

    /// Progress for `source`, inserting a fresh entry if unknown
    pub fn get(&mut self, source: &str) -> WarcRecordProgress {
        *self.warcs_progress.entry(source.to_string()).or_default()
    }

    /// Progress for `source` without inserting
    pub fn peek(&self, source: &str) -> Option<&WarcRecordProgress> {
        self.warcs_progress.get(source)
    }

    /// Mark `source` as finished
    pub fn mark_done(&mut self, source: &str) {
        self.warcs_progress
            .entry(source.to_string())
            .or_default()
            .done = true;
    }

    /// Record that `idx` was written for `source`. Never moves backwards.
    pub fn record_seen(&mut self, source: &str, idx: u64) {
        let entry = self.warcs_progress.entry(source.to_string()).or_default();
        entry.last_record_seen = entry.last_record_seen.max(idx as i64);
    }

    /// Sum of raw last seen record indices, -1 included (diagnostic only)
    pub fn total_records_seen(&self) -> i64 {
        self.warcs_progress.values().map(|p| p.last_record_seen).sum()
    }

    /// Number of sources marked done
    pub fn done_count(&self) -> usize {
        self.warcs_progress.values().filter(|p| p.done).count()
    }

    pub fn len(&self) -> usize {
        self.warcs_progress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warcs_progress.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.persistent_path
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, &WarcRecordProgress)> {
        self.warcs_progress.iter()
    }

    /// Write the whole map to disk atomically (temp file, then rename)
    pub fn save(&self) -> Result<(), PipelineError> {
        let encoded = serde_json::to_string_pretty(self)?;

        let temp_path = self.persistent_path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(encoded.as_bytes())?;
        file.sync_all()?;

        fs::rename(temp_path, &self.persistent_path)?;
        Ok(())
    }

    /// Remove the persisted file, if any
    pub fn delete(&self) -> Result<(), PipelineError> {
        match fs::remove_file(&self.persistent_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
