//! Crash recovery
//!
//! Replays the output of an interrupted run into the new temp file and
//! rebuilds progress from the replayed documents.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use super::output::OutputWriter;
use super::progress::ProgressStore;
use super::PipelineError;
use crate::types::Document;

/// What a replay found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryOutcome {
    /// Complete lines copied into the new temp file
    pub replayed_lines: u64,
    /// Whether a partial or corrupt tail was dropped
    pub discarded_tail: bool,
}

/// Replay `old_path` (if present) into `writer`, updating `progress`.
///
/// Reading stops at the first line that is truncated, fails to decompress,
/// or does not parse as a document: that is where the previous writer
/// stopped. The old file is removed afterwards. Errors writing the new temp
/// file are returned and leave the old file in place.
pub fn rewind_old_output(
    old_path: &Path,
    writer: &mut OutputWriter,
    progress: &mut ProgressStore,
) -> Result<RecoveryOutcome, PipelineError> {
    if !old_path.exists() {
        return Ok(RecoveryOutcome::default());
    }

    let mut outcome = RecoveryOutcome::default();
    match File::open(old_path).and_then(zstd::stream::read::Decoder::new) {
        Ok(decoder) => {
            let mut reader = BufReader::new(decoder);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Stopping replay at decompression error: {}", e);
                        outcome.discarded_tail = true;
                        break;
                    }
                }
                let Some(document) = parse_complete_line(&line) else {
                    outcome.discarded_tail = true;
                    break;
                };
                writer.write_raw_line(&line)?;
                progress.record_seen(&document.warc_file, document.record_idx);
                outcome.replayed_lines += 1;
            }
        }
        Err(e) => {
            warn!("Cannot read {}: {}", old_path.display(), e);
            outcome.discarded_tail = true;
        }
    }

    fs::remove_file(old_path)?;
    info!(
        "Replayed {} lines from {}, {} records already seen",
        outcome.replayed_lines,
        old_path.display(),
        progress.total_records_seen()
    );
    Ok(outcome)
}

/// A newline-terminated line holding one valid document
fn parse_complete_line(line: &[u8]) -> Option<Document> {
    let content = line.strip_suffix(b"\n")?;
    let text = std::str::from_utf8(content).ok()?;
    Document::from_json_line(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::output::{GroupPaths, OutputCommit};
    use std::collections::BTreeMap;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn document(source: &str, record_idx: u64) -> Document {
        Document {
            text: format!("text of record {}", record_idx),
            date: "2024-12-01T00:00:00Z".to_string(),
            url: format!("https://example.com/{}", record_idx),
            language: "en".to_string(),
            language_score: 0.95,
            warc_id: format!("<urn:uuid:{}>", record_idx),
            scores: BTreeMap::new(),
            group_idx: 0,
            warc_file: source.to_string(),
            record_idx,
            repetitions: Some(0.0),
            long_words: Some(0.0),
        }
    }

    /// Write a zstd file holding `content` verbatim
    fn write_old(path: &Path, content: &[u8]) {
        let mut enc = zstd::stream::write::Encoder::new(File::create(path).unwrap(), 3).unwrap();
        enc.write_all(content).unwrap();
        enc.finish().unwrap();
    }

    fn read_all(path: &Path) -> String {
        let mut out = String::new();
        zstd::stream::read::Decoder::new(File::open(path).unwrap())
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_replay_keeps_complete_lines_and_drops_truncated_tail() {
        let dir = TempDir::new().unwrap();
        let commit = OutputCommit::new(GroupPaths::new(dir.path(), 0, "jsonl.zstd"));

        let mut content = String::new();
        for (source, idx) in [("a", 3), ("a", 7), ("b", 1)] {
            content.push_str(&document(source, idx).to_json_line().unwrap());
            content.push('\n');
        }
        let expected = content.clone();
        let partial = document("b", 4).to_json_line().unwrap();
        content.push_str(&partial[..partial.len() / 2]);
        write_old(&commit.paths().old_path, content.as_bytes());

        let mut progress = ProgressStore::new(&commit.paths().progress_path);
        let mut writer = commit.begin(3).unwrap();
        let outcome = rewind_old_output(&commit.paths().old_path, &mut writer, &mut progress).unwrap();
        commit.suspend(writer).unwrap();

        assert_eq!(outcome.replayed_lines, 3);
        assert!(outcome.discarded_tail);
        assert_eq!(progress.get("a").last_record_seen, 7);
        assert_eq!(progress.get("b").last_record_seen, 1);
        assert!(!commit.paths().old_path.exists());
        assert_eq!(read_all(&commit.paths().tmp_path), expected);
    }

    #[test]
    fn test_replay_stops_at_invalid_document() {
        let dir = TempDir::new().unwrap();
        let commit = OutputCommit::new(GroupPaths::new(dir.path(), 0, "jsonl.zstd"));

        let mut content = document("a", 0).to_json_line().unwrap();
        content.push_str("\n{\"text\":\"missing fields\"}\n");
        content.push_str(&document("a", 5).to_json_line().unwrap());
        content.push('\n');
        write_old(&commit.paths().old_path, content.as_bytes());

        let mut progress = ProgressStore::new(&commit.paths().progress_path);
        let mut writer = commit.begin(3).unwrap();
        let outcome = rewind_old_output(&commit.paths().old_path, &mut writer, &mut progress).unwrap();

        assert_eq!(outcome.replayed_lines, 1);
        assert_eq!(progress.get("a").last_record_seen, 0);
    }

    #[test]
    fn test_no_old_file_leaves_progress_untouched() {
        let dir = TempDir::new().unwrap();
        let commit = OutputCommit::new(GroupPaths::new(dir.path(), 0, "jsonl.zstd"));
        let mut progress = ProgressStore::new(&commit.paths().progress_path);
        progress.record_seen("a", 2);

        let mut writer = commit.begin(3).unwrap();
        let outcome = rewind_old_output(&commit.paths().old_path, &mut writer, &mut progress).unwrap();
        assert_eq!(outcome, RecoveryOutcome::default());
        assert_eq!(progress.get("a").last_record_seen, 2);
    }

    #[test]
    fn test_garbage_old_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        let commit = OutputCommit::new(GroupPaths::new(dir.path(), 0, "jsonl.zstd"));
        fs::write(&commit.paths().old_path, b"definitely not zstd").unwrap();

        let mut progress = ProgressStore::new(&commit.paths().progress_path);
        let mut writer = commit.begin(3).unwrap();
        let outcome = rewind_old_output(&commit.paths().old_path, &mut writer, &mut progress).unwrap();
        assert_eq!(outcome.replayed_lines, 0);
        assert!(outcome.discarded_tail);
        assert!(!commit.paths().old_path.exists());
    }
}
