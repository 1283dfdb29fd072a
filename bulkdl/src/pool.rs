//! Bounded transfer worker pool.
//!
//! The pool runs at most `limit` transfers at once, capped by the queue
//! length. Each worker greedily pulls the next pending record as soon as its
//! current transfer finishes, so slots never sit idle while work remains.
//! The first failed transfer resolves the whole pool with that error and
//! drops the sibling workers, which aborts their in-flight requests.
//!
//! Successful records are removed from the queue; failed and unstarted ones
//! stay behind, which is what lets a later session resume them.

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{DownloadError, Result};
use crate::job::{JobRecord, JobStatus};

/// Work queue shared by the pool workers.
#[derive(Clone)]
pub struct SharedQueue {
    records: Arc<Mutex<Vec<JobRecord>>>,
}

impl SharedQueue {
    pub fn new(records: Vec<JobRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Claim the next pending record, marking it in-flight.
    pub fn next_pending(&self) -> Option<JobRecord> {
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.status == JobStatus::Pending)?;
        record.status = JobStatus::InFlight;
        Some(record.clone())
    }

    /// Drop a finished record from the queue.
    pub fn remove(&self, filename: &str) {
        let mut records = self.records.lock();
        if let Some(idx) = records.iter().position(|r| r.job.filename == filename) {
            records.remove(idx);
        }
    }

    /// Records still queued, pending and in-flight alike.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Drain the queue with at most `limit` concurrent transfers.
///
/// # Errors
///
/// Resolves with the first transfer error. Sibling workers are dropped at
/// that point and their records remain queued.
pub async fn run<F, Fut>(queue: &SharedQueue, limit: usize, transfer: F) -> Result<()>
where
    F: Fn(JobRecord) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if queue.is_empty() {
        return Ok(());
    }

    let worker_count = limit.max(1).min(queue.len());
    debug!(workers = worker_count, queued = queue.len(), "starting transfers");

    let transfer = &transfer;
    let workers = (0..worker_count).map(|_| async move {
        while let Some(record) = queue.next_pending() {
            let filename = record.job.filename.clone();
            transfer(record).await?;
            queue.remove(&filename);
        }
        Ok::<(), DownloadError>(())
    });

    try_join_all(workers).await?;
    Ok(())
}
