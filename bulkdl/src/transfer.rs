//! Single-file transfer.
//!
//! Glue between the worker pool and the transport: builds the fetch spec
//! from a record, registers the request for cancellation, feeds received
//! chunks into the shared progress aggregator, and verifies the finished
//! file against its fingerprint. A file that fails verification is deleted
//! before the error surfaces, so the next session restarts it from scratch.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{DownloadError, Result};
use crate::integrity::is_broken;
use crate::job::JobRecord;
use crate::progress::ProgressAggregator;
use crate::reconcile::remove_file_or_dir;
use crate::registry::CancelRegistry;
use crate::traits::{EventTracker, FetchSpec, ProgressSink, TrackedEvent, Transport};

/// Download one file and verify it.
///
/// The record's `current_size` is the resume offset; bytes below it were
/// already counted into the progress seed during reconciliation.
pub async fn transfer_one<T: Transport>(
    transport: &T,
    registry: &CancelRegistry,
    record: JobRecord,
    timeout: Duration,
    aggregator: &ProgressAggregator,
    tracker: &dyn EventTracker,
) -> Result<()> {
    let target = record.target_path();
    let spec = FetchSpec {
        url: record.job.file_url.clone(),
        dest: target.clone(),
        offset: record.current_size,
        expected_len: record.total_size,
        timeout,
    };

    let guard = registry.register();
    let sink: ProgressSink = {
        let aggregator = aggregator.clone();
        Arc::new(move |len| aggregator.add_bytes(len))
    };

    transport
        .fetch(spec, sink, guard.token().clone())
        .await?;

    if let Some(fingerprint) = &record.fingerprint {
        if is_broken(Some(fingerprint), Some(&target)).await {
            remove_file_or_dir(&target)
                .await
                .map_err(|e| DownloadError::io(&target, e))?;
            return Err(DownloadError::CorruptFile { path: target });
        }
    }

    debug!(file = %record.job.filename, "transfer complete");
    tracker.track(&record, TrackedEvent::Download);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::FileJob;
    use crate::traits::{BoxFuture, RemoteInfo};
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    /// Fetch-only transport that writes a fixed body to the destination.
    struct ScriptedTransport {
        body: Vec<u8>,
        fail: bool,
        seen: Mutex<Option<FetchSpec>>,
    }

    impl ScriptedTransport {
        fn writing(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                fail: false,
                seen: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                body: Vec::new(),
                fail: true,
                seen: Mutex::new(None),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn probe(&self, _url: &str) -> BoxFuture<'_, Result<RemoteInfo>> {
            unimplemented!("fetch-only transport")
        }

        fn fetch(
            &self,
            spec: FetchSpec,
            on_chunk: ProgressSink,
            _cancel: CancellationToken,
        ) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                *self.seen.lock() = Some(spec.clone());
                if self.fail {
                    return Err(DownloadError::Network {
                        url: spec.url,
                        reason: "connection reset".to_string(),
                    });
                }
                tokio::fs::write(&spec.dest, &self.body).await.unwrap();
                on_chunk(self.body.len() as u64);
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct RecordingTracker {
        events: Mutex<Vec<(String, &'static str)>>,
    }

    impl EventTracker for RecordingTracker {
        fn track(&self, record: &JobRecord, event: TrackedEvent) {
            self.events
                .lock()
                .push((record.job.filename.clone(), event.as_str()));
        }
    }

    fn silent_aggregator(total: u64) -> ProgressAggregator {
        ProgressAggregator::new(total, 0, Duration::from_millis(1000), Box::new(|_| {}))
    }

    fn record_in(dir: &TempDir, name: &str, total_size: u64) -> JobRecord {
        let mut record = JobRecord::new(FileJob::new(
            format!("https://example.com/{}", name),
            dir.path(),
            name,
        ));
        record.total_size = total_size;
        record
    }

    #[tokio::test]
    async fn test_successful_transfer_tracks_and_reports() {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::writing(b"hello world");
        let registry = CancelRegistry::new();
        let aggregator = silent_aggregator(11);
        let tracker = RecordingTracker::default();
        let record = record_in(&dir, "a.bin", 11);

        transfer_one(
            &transport,
            &registry,
            record,
            Duration::from_secs(4),
            &aggregator,
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(aggregator.bytes_completed(), 11);
        assert_eq!(
            *tracker.events.lock(),
            vec![("a.bin".to_string(), "download")]
        );
        assert!(registry.is_empty());
        assert!(dir.path().join("a.bin").exists());
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_deletes_file() {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::writing(b"not the expected contents");
        let registry = CancelRegistry::new();
        let aggregator = silent_aggregator(25);
        let tracker = RecordingTracker::default();
        let mut record = record_in(&dir, "a.bin", 25);
        // MD5 of "hello world", which the transport does not write.
        record.fingerprint = Some("XrY7u+Ae7tCTyyK7j1rNww==".to_string());

        let err = transfer_one(
            &transport,
            &registry,
            record,
            Duration::from_secs(4),
            &aggregator,
            &tracker,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::CorruptFile { .. }));
        assert!(!dir.path().join("a.bin").exists());
        assert!(tracker.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_matching_fingerprint_passes() {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::writing(b"hello world");
        let registry = CancelRegistry::new();
        let aggregator = silent_aggregator(11);
        let tracker = RecordingTracker::default();
        let mut record = record_in(&dir, "a.bin", 11);
        record.fingerprint = Some("XrY7u+Ae7tCTyyK7j1rNww==".to_string());

        transfer_one(
            &transport,
            &registry,
            record,
            Duration::from_secs(4),
            &aggregator,
            &tracker,
        )
        .await
        .unwrap();

        assert!(dir.path().join("a.bin").exists());
        assert_eq!(tracker.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_without_tracking() {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::failing();
        let registry = CancelRegistry::new();
        let aggregator = silent_aggregator(100);
        let tracker = RecordingTracker::default();
        let record = record_in(&dir, "a.bin", 100);

        let err = transfer_one(
            &transport,
            &registry,
            record,
            Duration::from_secs(4),
            &aggregator,
            &tracker,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::Network { .. }));
        assert!(tracker.events.lock().is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_spec_carries_resume_offset() {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::writing(b"tail");
        let registry = CancelRegistry::new();
        let aggregator = silent_aggregator(100);
        let tracker = RecordingTracker::default();
        let mut record = record_in(&dir, "a.bin", 100);
        record.current_size = 96;

        transfer_one(
            &transport,
            &registry,
            record,
            Duration::from_millis(4000),
            &aggregator,
            &tracker,
        )
        .await
        .unwrap();

        let seen = transport.seen.lock().clone().unwrap();
        assert_eq!(seen.offset, 96);
        assert_eq!(seen.expected_len, 100);
        assert_eq!(seen.url, "https://example.com/a.bin");
        assert_eq!(seen.dest, dir.path().join("a.bin"));
        assert_eq!(seen.timeout, Duration::from_millis(4000));
    }
}
