//! Drives one group end to end
//!
//! Commit state check, recovery replay, worker pool, filter chain, progress
//! checkpoints and the final commit.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::fetcher::SourceFetcher;
use super::filter::{FilterChain, FilterOutcome, FilterSettings};
use super::output::{GroupPaths, OutputCommit, OutputState, OutputWriter};
use super::pool::WorkerPool;
use super::processor::{ArchiveStreamProcessor, RecordClassifier};
use super::progress::ProgressStore;
use super::recovery::rewind_old_output;
use super::stats::{GroupCounters, GroupStats};
use super::PipelineError;
use crate::config::{optional_reference, Config, OutputConfig, WorkerConfig};
use crate::dedup::{BloomFilter, Deduplicator};
use crate::language::{ClassifierLanguageDetector, LanguageDetector};
use crate::models::{load_classifier, ModelProvider, ModelStore};
use crate::scoring::{ScoringModels, ScoringProvider};
use crate::types::{SourceId, WorkerMessage};
use crate::util::truncate_str;

/// Builds a fresh deduplicator for each group
pub type DedupFactory = Box<dyn Fn() -> Result<Box<dyn Deduplicator>, PipelineError> + Send + Sync>;

/// How a group run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The final artifact already existed
    Skipped,
    /// The output was committed
    Committed(GroupCounters),
    /// Some sources failed and the output was left uncommitted for the next run
    Incomplete(GroupCounters),
}

/// Expand and check the configured language list.
///
/// `ALL` (any case) selects every language the detector knows.
pub fn resolve_languages(
    configured: &[String],
    detector: &dyn LanguageDetector,
) -> Result<Vec<String>, PipelineError> {
    if configured.is_empty() {
        return Err(PipelineError::Config("language list is empty".to_string()));
    }
    let languages = if configured.iter().any(|l| l.eq_ignore_ascii_case("ALL")) {
        detector.languages()?
    } else {
        configured.to_vec()
    };
    if languages.is_empty() {
        return Err(PipelineError::Config("language list is empty".to_string()));
    }
    Ok(languages)
}

/// Runs groups one at a time with shared models and settings
pub struct GroupOrchestrator {
    output: OutputConfig,
    workers: WorkerConfig,
    settings: FilterSettings,
    processor: Arc<ArchiveStreamProcessor>,
    dedup_factory: Option<DedupFactory>,
    scorer: Option<Box<dyn ScoringProvider>>,
    quiet: bool,
}

impl GroupOrchestrator {
    pub fn new(
        config: &Config,
        processor: Arc<ArchiveStreamProcessor>,
        dedup_factory: Option<DedupFactory>,
        scorer: Option<Box<dyn ScoringProvider>>,
    ) -> Self {
        Self {
            output: config.output.clone(),
            workers: config.workers.clone(),
            settings: FilterSettings::from(&config.filter),
            processor,
            dedup_factory,
            scorer,
            quiet: false,
        }
    }

    /// Hide progress bars
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Wire up the real collaborators: model store, fastText detector,
    /// HTTP fetcher, bloom filter and scoring models.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let store = Arc::new(ModelStore::new(
            config.models.cache_dir.clone(),
            &config.fetch.user_agent,
        )?);

        let detector_path = store.ensure_local(&config.models.language_detector)?;
        info!(path = %detector_path.display(), "Loading language detector");
        let detector: Arc<dyn LanguageDetector> =
            Arc::new(ClassifierLanguageDetector::new(load_classifier(&detector_path)?));
        let languages = resolve_languages(&config.filter.languages, detector.as_ref())?;
        info!("Keeping {} languages", languages.len());

        let classifier = RecordClassifier::new(detector, languages.clone(), config.filter.min_length);
        let fetcher = Arc::new(SourceFetcher::new(&config.fetch)?);
        let processor = Arc::new(ArchiveStreamProcessor::new(fetcher, Arc::new(classifier)));

        let dedup_factory = match config.filter.bloom_filter.as_deref().and_then(optional_reference) {
            Some(reference) => {
                let path = store.ensure_local(&reference)?;
                let factory: DedupFactory = Box::new(move || {
                    let filter = BloomFilter::load(&path)?;
                    debug!(bytes = filter.size_bytes(), "Loaded bloom filter");
                    Ok(Box::new(filter) as Box<dyn Deduplicator>)
                });
                Some(factory)
            }
            None => None,
        };

        let scorer = match config.filter.scoring_models.as_deref().and_then(optional_reference) {
            Some(models_dir) => {
                let provider: Arc<dyn ModelProvider> = store.clone();
                let mut models = ScoringModels::new(
                    models_dir,
                    languages,
                    provider,
                    Box::new(|path: &Path| load_classifier(path)),
                );
                if config.filter.load_models_early {
                    models.load_all()?;
                    info!("Loaded {} scoring models", models.loaded_count());
                }
                Some(Box::new(models) as Box<dyn ScoringProvider>)
            }
            None => None,
        };

        Ok(Self::new(config, processor, dedup_factory, scorer))
    }

    /// Build one group's output artifact from `sources`
    pub fn run(
        &mut self,
        group_idx: usize,
        sources: &[SourceId],
    ) -> Result<GroupOutcome, PipelineError> {
        fs::create_dir_all(&self.output.destination)?;
        let commit = OutputCommit::new(GroupPaths::new(
            &self.output.destination,
            group_idx,
            &self.output.extension,
        ));

        if commit.state() == OutputState::Committed {
            info!(
                group = group_idx,
                "{} already exists, skipping group",
                commit.paths().final_path.display()
            );
            return Ok(GroupOutcome::Skipped);
        }

        let mut progress = ProgressStore::load(&commit.paths().progress_path)?;
        let mut writer = commit.begin(self.output.compression_level)?;
        let recovery = rewind_old_output(&commit.paths().old_path, &mut writer, &mut progress)?;
        if recovery.discarded_tail {
            debug!(group = group_idx, "Discarded a partial tail while replaying");
        }
        writer.flush()?;
        progress.save()?;

        let snapshot: Vec<_> = sources
            .iter()
            .map(|source| (source.clone(), progress.get(source)))
            .collect();
        info!(
            group = group_idx,
            "Processing {} WARCs ({} already done, {} lines recovered)",
            sources.len(),
            snapshot.iter().filter(|(_, p)| p.done).count(),
            recovery.replayed_lines
        );

        let dedup = match &self.dedup_factory {
            Some(factory) => Some(factory()?),
            None => None,
        };
        let scorer = match self.scorer.as_mut() {
            Some(scorer) => Some(&mut **scorer as &mut dyn ScoringProvider),
            None => None,
        };
        let mut chain = FilterChain::new(self.settings, dedup, scorer);
        let mut stats = GroupStats::new(group_idx, sources.len(), self.quiet);

        let pool = WorkerPool::start(Arc::clone(&self.processor), snapshot, group_idx, &self.workers)?;
        let drained = drain_results(&pool, &mut chain, &mut writer, &mut progress, &mut stats);
        pool.shutdown();
        drained?;
        stats.finish();

        let counters = stats.counters();
        if counters.sources_failed > 0 && !self.output.commit_with_failed_sources {
            writer.flush()?;
            progress.save()?;
            commit.suspend(writer)?;
            warn!(
                group = group_idx,
                "{} WARCs failed, leaving output uncommitted for the next run",
                counters.sources_failed
            );
            return Ok(GroupOutcome::Incomplete(counters));
        }

        commit.commit(writer)?;
        progress.delete()?;
        info!(
            group = group_idx,
            "Committed {} ({} documents)",
            commit.paths().final_path.display(),
            counters.documents_written
        );
        Ok(GroupOutcome::Committed(counters))
    }
}

/// Consume pool results until every source has reported
fn drain_results(
    pool: &WorkerPool,
    chain: &mut FilterChain<'_>,
    writer: &mut OutputWriter,
    progress: &mut ProgressStore,
    stats: &mut GroupStats,
) -> Result<(), PipelineError> {
    let mut reports = 0;
    while reports < pool.expected_reports() {
        match pool.recv()? {
            WorkerMessage::Document(document) => {
                let source = document.warc_file.clone();
                let record_idx = document.record_idx;
                match chain.apply(document)? {
                    FilterOutcome::Accepted(document) => {
                        writer.write_line(&document.to_json_line()?)?;
                        progress.record_seen(&source, record_idx);
                        stats.document_written();
                    }
                    rejected => {
                        debug!(source = %source, record_idx, "Filtered: {:?}", rejected);
                        stats.document_filtered();
                    }
                }
            }
            WorkerMessage::Completed(report) => {
                reports += 1;
                if report.success {
                    progress.mark_done(&report.source);
                } else {
                    warn!(
                        "WARC failed: {} ({} records read)",
                        truncate_str(&report.source, 200),
                        report.total_records
                    );
                }
                writer.flush()?;
                progress.save()?;
                stats.source_completed(&report);
            }
        }
    }
    Ok(())
}
