//! Resumable, parallel group pipeline
//!
//! For each group: check the output commit state, replay any interrupted
//! output, fan the group's archive sources out to a worker pool, filter the
//! resulting documents into a zstd temp file, then commit it by rename.

mod error;
pub mod fetcher;
pub mod filter;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod pool;
pub mod processor;
pub mod progress;
pub mod recovery;
pub mod runner;
pub mod stats;

pub use error::PipelineError;
pub use fetcher::{ArchiveFetcher, FetchError, SourceFetcher};
pub use filter::{FilterChain, FilterOutcome, FilterSettings};
pub use orchestrator::{resolve_languages, DedupFactory, GroupOrchestrator, GroupOutcome};
pub use output::{GroupPaths, OutputCommit, OutputState};
pub use processor::{ArchiveStreamProcessor, RecordClassifier, Rejection};
pub use progress::{ProgressStore, WarcRecordProgress};
pub use runner::{run_groups, RunSummary};
pub use stats::GroupCounters;
