//! Remote size probing.
//!
//! Before anything touches the disk, every file in the batch is probed for
//! its remote size and fingerprint. All probes run concurrently; the first
//! failure cancels the rest and aborts the session, so a batch with an
//! unreachable file fails before any transfer starts.

use futures::future::try_join_all;
use tracing::debug;

use crate::error::{DownloadError, Result};
use crate::job::JobRecord;
use crate::registry::CancelRegistry;
use crate::traits::Transport;

/// Probe every record's URL and fill in `total_size` and `fingerprint`.
///
/// # Returns
///
/// The summed remote size of the batch in bytes.
///
/// # Errors
///
/// Fails with the first probe error. Sibling probes are dropped and their
/// registry entries cleaned up.
pub async fn probe_all<T: Transport>(
    transport: &T,
    registry: &CancelRegistry,
    records: &mut [JobRecord],
) -> Result<u64> {
    debug!(files = records.len(), "probing remote sizes");

    let probes = records.iter().map(|record| {
        let url = record.job.file_url.clone();
        async move {
            let guard = registry.register();
            tokio::select! {
                biased;
                _ = guard.token().cancelled() => Err(DownloadError::aborted(url.clone())),
                info = transport.probe(&url) => info,
            }
        }
    });
    let infos = try_join_all(probes).await?;

    let mut total = 0u64;
    for (record, info) in records.iter_mut().zip(infos) {
        record.total_size = info.total_size;
        record.fingerprint = info.fingerprint;
        total += info.total_size;
    }

    Ok(total)
}
