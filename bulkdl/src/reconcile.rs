//! Local state reconciliation.
//!
//! After probing, each record is compared against what is already on disk.
//! Three outcomes per file:
//!
//! - smaller than the remote size: partial download, kept in the queue and
//!   resumed from its current offset
//! - at least the remote size but failing its fingerprint: corrupt, deleted
//!   and re-queued from scratch
//! - at least the remote size and verified (or unverifiable for lack of a
//!   fingerprint): complete, dropped from the queue
//!
//! Bytes of partial and complete files count toward the session's starting
//! progress so a resumed batch does not restart at zero percent.

use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{DownloadError, Result};
use crate::integrity::is_broken;
use crate::job::JobRecord;

/// What reconciliation found on disk.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Bytes already present locally, counted into the progress seed.
    pub resumed_bytes: u64,
    /// Records that still need a transfer, in input order.
    pub queued: Vec<JobRecord>,
}

/// Compare every record against the local filesystem and split the batch
/// into work and already-done.
///
/// Download directories are created here so transfers can open their target
/// files in append mode without racing on directory creation.
///
/// # Errors
///
/// Fails when a download directory cannot be created or a corrupt file
/// cannot be deleted.
pub async fn reconcile(records: &mut [JobRecord]) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for record in records.iter_mut() {
        tokio::fs::create_dir_all(&record.job.download_path)
            .await
            .map_err(|e| DownloadError::io(&record.job.download_path, e))?;

        let target = record.target_path();
        record.current_size = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        if record.current_size < record.total_size {
            if record.current_size > 0 {
                debug!(
                    file = %record.job.filename,
                    offset = record.current_size,
                    "resuming partial file"
                );
            }
            report.resumed_bytes += record.current_size;
            report.queued.push(record.clone());
            continue;
        }

        // Full-sized file. Verify when the server advertised a fingerprint;
        // without one, size is the only evidence we have.
        if let Some(fingerprint) = record.fingerprint.clone() {
            if is_broken(Some(&fingerprint), Some(&target)).await {
                warn!(file = %record.job.filename, "local file corrupt, downloading again");
                remove_file_or_dir(&target)
                    .await
                    .map_err(|e| DownloadError::io(&target, e))?;
                record.current_size = 0;
                report.queued.push(record.clone());
                continue;
            }
        }

        report.resumed_bytes += record.current_size;
    }

    Ok(report)
}

/// Remove a path whatever it is. A directory squatting on a target path
/// blocks the download just as much as a stale file does.
pub(crate) async fn remove_file_or_dir(path: &Path) -> io::Result<()> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}
