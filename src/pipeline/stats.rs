//! Aggregate progress for one group

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::types::ArchiveCompletionReport;
use crate::util::percent;

/// Emit a summary line every this many completion reports
pub const SUMMARY_INTERVAL: usize = 10;

/// Counters for one group run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCounters {
    pub sources_total: usize,
    pub sources_reported: usize,
    pub sources_failed: usize,
    pub records_total: u64,
    pub records_processed: u64,
    pub records_failed: u64,
    pub documents_written: u64,
    pub documents_filtered: u64,
}

impl GroupCounters {
    /// `WARC progress: n/N files (f failed, p%) | Records: x processed, y failed (q%)`
    pub fn summary_line(&self) -> String {
        format!(
            "WARC progress: {}/{} files ({} failed, {:.1}%) | Records: {} processed, {} failed ({:.1}%)",
            self.sources_reported,
            self.sources_total,
            self.sources_failed,
            percent(self.sources_failed as u64, self.sources_total as u64),
            self.records_processed,
            self.records_failed,
            percent(self.records_failed, self.records_total),
        )
    }
}

/// Tracks counters and drives the optional progress bar
pub struct GroupStats {
    group_idx: usize,
    counters: GroupCounters,
    /// Progress bar (None in quiet mode)
    progress_bar: Option<ProgressBar>,
}

impl GroupStats {
    pub fn new(group_idx: usize, sources_total: usize, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new(sources_total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} WARCs ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message(format!("group {}", group_idx));
            Some(pb)
        } else {
            None
        };

        Self {
            group_idx,
            counters: GroupCounters {
                sources_total,
                ..GroupCounters::default()
            },
            progress_bar,
        }
    }

    pub fn counters(&self) -> GroupCounters {
        self.counters
    }

    pub fn document_written(&mut self) {
        self.counters.documents_written += 1;
    }

    pub fn document_filtered(&mut self) {
        self.counters.documents_filtered += 1;
    }

    /// Fold in a completion report, logging a summary every [`SUMMARY_INTERVAL`] reports
    pub fn source_completed(&mut self, report: &ArchiveCompletionReport) {
        let c = &mut self.counters;
        c.sources_reported += 1;
        if !report.success {
            c.sources_failed += 1;
        }
        c.records_total += report.total_records;
        c.records_processed += report.processed_records;
        c.records_failed += report.failed_records;

        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
            pb.set_message(format!(
                "group {} | {} docs | {} failed WARCs",
                self.group_idx, c.documents_written, c.sources_failed
            ));
        }

        if c.sources_reported % SUMMARY_INTERVAL == 0 {
            self.log_summary();
        }
    }

    pub fn log_summary(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.suspend(|| info!(group = self.group_idx, "{}", self.counters.summary_line()));
        } else {
            info!(group = self.group_idx, "{}", self.counters.summary_line());
        }
    }

    /// Final summary and progress bar teardown
    pub fn finish(&self) {
        self.log_summary();
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!(
                "group {} done: {} written, {} filtered",
                self.group_idx, self.counters.documents_written, self.counters.documents_filtered
            ));
        }
    }
}
