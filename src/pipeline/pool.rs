//! Fixed-size worker pool over a shared source queue
//!
//! Workers pull sources from an unbounded FIFO queue and push documents and
//! completion reports onto one bounded result channel. Each worker exits when
//! it dequeues an exit sentinel; one sentinel is queued per worker after the
//! sources, so every worker drains the queue before leaving.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rand::Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::processor::ArchiveStreamProcessor;
use super::progress::WarcRecordProgress;
use super::PipelineError;
use crate::config::WorkerConfig;
use crate::types::{ArchiveCompletionReport, SourceId, WorkerMessage};

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// One unit of work on the queue
enum WorkItem {
    Source {
        source: SourceId,
        progress: WarcRecordProgress,
    },
    Exit,
}

/// Running pool for one group
pub struct WorkerPool {
    results: Receiver<WorkerMessage>,
    handles: Vec<JoinHandle<()>>,
    expected_reports: usize,
    shutdown_grace: Duration,
}

impl WorkerPool {
    /// Queue every source and start `config.count` workers.
    ///
    /// `sources` carries each source with its progress snapshot; workers never
    /// see the live progress store.
    pub fn start(
        processor: Arc<ArchiveStreamProcessor>,
        sources: Vec<(SourceId, WarcRecordProgress)>,
        group_idx: usize,
        config: &WorkerConfig,
    ) -> Result<Self, PipelineError> {
        let worker_count = config.count.max(1);
        let expected_reports = sources.len();

        let (work_tx, work_rx) = unbounded::<WorkItem>();
        for (source, progress) in sources {
            send_work(&work_tx, WorkItem::Source { source, progress })?;
        }
        for _ in 0..worker_count {
            send_work(&work_tx, WorkItem::Exit)?;
        }
        drop(work_tx);

        let (result_tx, result_rx) = bounded::<WorkerMessage>(config.result_buffer.max(1));
        let max_jitter_ms = config.max_start_jitter().as_millis() as u64;

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let processor = Arc::clone(&processor);
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("warc-worker-{}-{}", group_idx, worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        group_idx,
                        &processor,
                        &work_rx,
                        &result_tx,
                        max_jitter_ms,
                    )
                })?;
            handles.push(handle);
        }

        Ok(Self {
            results: result_rx,
            handles,
            expected_reports,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    /// Number of completion reports the pool will produce
    pub fn expected_reports(&self) -> usize {
        self.expected_reports
    }

    /// Block for the next result
    pub fn recv(&self) -> Result<WorkerMessage, PipelineError> {
        self.results.recv().map_err(|_| {
            PipelineError::WorkerPool("all workers exited before reporting".to_string())
        })
    }

    /// Wait up to the grace period for workers to exit, then detach stragglers
    pub fn shutdown(self) {
        let WorkerPool {
            results,
            mut handles,
            shutdown_grace,
            ..
        } = self;
        // Unblocks any worker still waiting to send
        drop(results);

        let deadline = Instant::now() + shutdown_grace;
        while handles.iter().any(|h| !h.is_finished()) && Instant::now() < deadline {
            thread::sleep(SHUTDOWN_POLL);
        }

        for handle in handles.drain(..) {
            if !handle.is_finished() {
                let name = handle.thread().name().unwrap_or("worker").to_string();
                warn!("{} did not exit within {:?}, detaching", name, shutdown_grace);
                continue;
            }
            if handle.join().is_err() {
                error!("Worker thread panicked outside of source processing");
            }
        }
    }
}

fn send_work(tx: &Sender<WorkItem>, item: WorkItem) -> Result<(), PipelineError> {
    tx.send(item)
        .map_err(|_| PipelineError::WorkerPool("work queue closed".to_string()))
}

fn run_worker(
    worker_id: usize,
    group_idx: usize,
    processor: &ArchiveStreamProcessor,
    work_rx: &Receiver<WorkItem>,
    result_tx: &Sender<WorkerMessage>,
    max_jitter_ms: u64,
) {
    if max_jitter_ms > 0 {
        let jitter = rand::thread_rng().gen_range(0..=max_jitter_ms);
        thread::sleep(Duration::from_millis(jitter));
    }

    while let Ok(item) = work_rx.recv() {
        let (source, progress) = match item {
            WorkItem::Source { source, progress } => (source, progress),
            WorkItem::Exit => break,
        };
        debug!(worker_id, group_idx, source = %source, "Processing archive");

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            processor.process(&source, progress, group_idx, &mut |document| {
                result_tx.send(WorkerMessage::Document(document)).is_ok()
            })
        }));
        let report = outcome.unwrap_or_else(|_| {
            error!(worker_id, source = %source, "Worker panicked while processing archive");
            ArchiveCompletionReport {
                source: source.clone(),
                success: false,
                total_records: 0,
                processed_records: 0,
                failed_records: 0,
            }
        });

        if result_tx.send(WorkerMessage::Completed(report)).is_err() {
            break;
        }
    }
    debug!(worker_id, group_idx, "Worker exiting");
}
