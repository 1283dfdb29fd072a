//! Download session orchestration.
//!
//! This module drives the full batch workflow:
//! 1. Probe every remote file for its size and fingerprint
//! 2. Reconcile against local state (resume partials, restart corrupt files,
//!    skip completed ones)
//! 3. Drain the remainder through a bounded transfer pool
//! 4. Extract archives flagged for decompression
//!
//! One manager runs one session at a time; a second `start()` while a
//! session runs is rejected. `stop()` cancels the running session from any
//! thread, and a stopped session resolves with [`SessionOutcome::Stopped`]
//! rather than an error.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::ManagerConfig;
use crate::error::{DownloadError, Result};
use crate::extract::{process_queue, ShellExtractor};
use crate::http::HttpTransport;
use crate::job::{FileJob, JobRecord};
use crate::pool::{self, SharedQueue};
use crate::probe::probe_all;
use crate::progress::{ProgressAggregator, ProgressCallback};
use crate::reconcile::reconcile;
use crate::registry::CancelRegistry;
use crate::traits::{ArchiveExtractor, EventTracker, NoopTracker, Transport};
use crate::transfer::transfer_one;

/// Lifecycle phases of a download session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No session has run yet.
    Idle,
    /// Querying remote sizes and fingerprints.
    Probing,
    /// Comparing the batch against local files.
    Reconciling,
    /// Streaming transfers through the worker pool.
    Transferring,
    /// Unpacking flagged archives.
    Extracting,
    /// The last session completed.
    Done,
    /// The last session failed.
    Failed,
    /// The last session was stopped.
    Stopped,
}

impl Phase {
    /// Get a human-readable name for the phase.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Probing => "Probing",
            Self::Reconciling => "Reconciling",
            Self::Transferring => "Transferring",
            Self::Extracting => "Extracting",
            Self::Done => "Done",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every transfer and extraction finished.
    Completed(SessionSummary),
    /// The session was stopped before finishing.
    Stopped,
}

/// Result of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Bytes actually streamed this session, excluding bytes found on disk.
    pub bytes_transferred: u64,
    /// Total remote size of the batch.
    pub bytes_total: u64,
    /// Number of files transferred this session.
    pub files_downloaded: usize,
    /// Number of archives extracted.
    pub files_extracted: usize,
}

/// Batch download manager.
///
/// Orchestrates probing, reconciliation, bounded-concurrency transfers,
/// integrity checks and post-download extraction for one batch at a time.
/// Generic over its collaborators so tests can substitute transports and
/// extractors.
pub struct DownloadManager<T = HttpTransport, X = ShellExtractor> {
    /// HTTP collaborator for probing and fetching.
    transport: T,
    /// Archive extraction collaborator.
    extractor: X,
    /// Sink for download/decompress lifecycle events.
    tracker: Arc<dyn EventTracker>,
    /// Session tunables.
    config: ManagerConfig,
    /// Cancellation handles of the requests currently in flight.
    registry: CancelRegistry,
    /// Last observed lifecycle phase.
    phase: Mutex<Phase>,
    /// Cancellation token of the running session.
    session_token: Mutex<CancellationToken>,
    /// Held for the duration of `start()`; rejects overlapping sessions.
    run_guard: tokio::sync::Mutex<()>,
}

impl DownloadManager {
    /// Create a manager with the production transport and extractor.
    pub fn new(config: ManagerConfig) -> Self {
        Self::with_collaborators(config, HttpTransport::new(), ShellExtractor::new())
    }
}

impl<T: Transport, X: ArchiveExtractor> DownloadManager<T, X> {
    /// Create a manager with explicit collaborators.
    pub fn with_collaborators(config: ManagerConfig, transport: T, extractor: X) -> Self {
        Self {
            transport,
            extractor,
            tracker: Arc::new(NoopTracker),
            config,
            registry: CancelRegistry::new(),
            phase: Mutex::new(Phase::Idle),
            session_token: Mutex::new(CancellationToken::new()),
            run_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the lifecycle event tracker.
    pub fn with_tracker(mut self, tracker: Arc<dyn EventTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock() = phase;
        debug!(phase = phase.name(), "session phase changed");
    }

    /// Run one download session to completion.
    ///
    /// `on_progress` is invoked for every received chunk with the aggregate
    /// state of the whole batch.
    ///
    /// # Errors
    ///
    /// Fails fast: the first probe, transfer, integrity or extraction error
    /// cancels everything else and surfaces here. A session torn down by
    /// [`stop()`](Self::stop) is not an error; it resolves with
    /// [`SessionOutcome::Stopped`].
    pub async fn start(
        &self,
        jobs: Vec<FileJob>,
        on_progress: ProgressCallback,
    ) -> Result<SessionOutcome> {
        let _running = self.run_guard.try_lock().map_err(|_| {
            DownloadError::InvalidInput("a session is already running".to_string())
        })?;

        for job in &jobs {
            if job.filename.is_empty() {
                return Err(DownloadError::InvalidInput(format!(
                    "job for {} has an empty filename",
                    job.file_url
                )));
            }
            if job.file_url.is_empty() {
                return Err(DownloadError::InvalidInput(format!(
                    "job {} has an empty URL",
                    job.filename
                )));
            }
        }

        let token = CancellationToken::new();
        *self.session_token.lock() = token.clone();
        info!(files = jobs.len(), "session started");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Ok(SessionOutcome::Stopped),
            result = self.run_session(jobs, on_progress, &token) => {
                result.map(SessionOutcome::Completed)
            }
        };

        // Teardown. No in-flight request survives the session, whatever
        // the outcome.
        self.registry.cancel_all();

        match result {
            Ok(SessionOutcome::Stopped) => {
                info!("session stopped");
                self.set_phase(Phase::Stopped);
                Ok(SessionOutcome::Stopped)
            }
            Ok(outcome) => {
                info!("session complete");
                self.set_phase(Phase::Done);
                Ok(outcome)
            }
            Err(_) if token.is_cancelled() => {
                // The abort raced the stop signal; the stop wins.
                info!("session stopped");
                self.set_phase(Phase::Stopped);
                Ok(SessionOutcome::Stopped)
            }
            Err(err) => {
                self.set_phase(Phase::Failed);
                Err(err)
            }
        }
    }

    /// Stop the running session.
    ///
    /// Cancels every in-flight request. Safe to call from any thread and
    /// harmless when nothing is running.
    pub fn stop(&self) {
        info!("stopping session");
        let token = self.session_token.lock().clone();
        token.cancel();
        self.registry.cancel_all();
    }

    #[instrument(skip_all, fields(files = jobs.len()))]
    async fn run_session(
        &self,
        jobs: Vec<FileJob>,
        on_progress: ProgressCallback,
        token: &CancellationToken,
    ) -> Result<SessionSummary> {
        let mut records: Vec<JobRecord> = jobs.into_iter().map(JobRecord::new).collect();

        self.set_phase(Phase::Probing);
        let total_remote = probe_all(&self.transport, &self.registry, &mut records).await?;

        self.set_phase(Phase::Reconciling);
        let report = reconcile(&mut records).await?;
        let queued_count = report.queued.len();

        let aggregator = ProgressAggregator::new(
            total_remote,
            report.resumed_bytes,
            self.config.progress_interval,
            on_progress,
        );

        if report.queued.is_empty() {
            // Everything was already on disk; announce the standing state.
            aggregator.announce(0);
        } else {
            self.set_phase(Phase::Transferring);
            let queue = SharedQueue::new(report.queued);
            pool::run(&queue, self.config.max_parallel, |record| {
                transfer_one(
                    &self.transport,
                    &self.registry,
                    record,
                    self.config.timeout,
                    &aggregator,
                    self.tracker.as_ref(),
                )
            })
            .await?;
        }

        self.set_phase(Phase::Extracting);
        let mut decompression_queue: Vec<JobRecord> = records
            .iter()
            .filter(|record| record.job.decompress)
            .cloned()
            .collect();
        let files_extracted = process_queue(
            &self.extractor,
            &mut decompression_queue,
            self.tracker.as_ref(),
            token,
        )?;

        let bytes_completed = aggregator.bytes_completed();
        aggregator.close();

        Ok(SessionSummary {
            bytes_transferred: bytes_completed.saturating_sub(report.resumed_bytes),
            bytes_total: total_remote,
            files_downloaded: queued_count,
            files_extracted,
        })
    }
}
