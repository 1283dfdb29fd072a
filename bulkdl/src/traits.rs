//! Collaborator traits for the download engine.
//!
//! The engine core is generic over three seams:
//!
//! - [`Transport`] performs the actual HTTP work (size probing and streaming
//!   transfers). The production implementation is
//!   [`HttpTransport`](crate::http::HttpTransport); tests substitute mocks.
//! - [`ArchiveExtractor`] unpacks downloaded archives after the batch
//!   finishes transferring.
//! - [`EventTracker`] receives lifecycle notifications (file downloaded,
//!   archive extracted) for telemetry or UI purposes.
//!
//! # Dyn Compatibility
//!
//! `Transport` uses `Pin<Box<dyn Future>>` for its async methods so the trait
//! stays usable as a trait object. Futures own their inputs and borrow only
//! the transport itself, which keeps call sites free of lifetime plumbing.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::job::JobRecord;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback invoked with the byte length of each received chunk.
pub type ProgressSink = Arc<dyn Fn(u64) + Send + Sync>;

/// What a size probe learned about a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Remote length in bytes. Zero when the server sent no `Content-Length`.
    pub total_size: u64,
    /// Base64 MD5 digest from the `Content-MD5` header, when advertised.
    pub fingerprint: Option<String>,
}

/// Everything a transport needs to stream one file to disk.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    /// Remote HTTP(S) source.
    pub url: String,
    /// Local file the body is appended to.
    pub dest: PathBuf,
    /// Byte offset to resume from. Zero requests the whole file.
    pub offset: u64,
    /// Expected final size of the local file in bytes.
    pub expected_len: u64,
    /// Idle timeout applied to the initial response and to each chunk.
    pub timeout: Duration,
}

/// HTTP side of the engine: size probing and streaming transfers.
pub trait Transport: Send + Sync {
    /// Query the remote size and fingerprint of `url` without downloading
    /// the body.
    ///
    /// # Returns
    ///
    /// The advertised `Content-Length` (zero when missing) and the
    /// `Content-MD5` header value when the server sends one.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server answers with a
    /// non-success status.
    fn probe(&self, url: &str) -> BoxFuture<'_, Result<RemoteInfo>>;

    /// Stream the remote file described by `spec` to disk, appending at
    /// `spec.offset`.
    ///
    /// `on_chunk` is invoked with the length of every received chunk before
    /// it is written. Cancelling `cancel` aborts the transfer; the partial
    /// file is left on disk for a later resume.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failures, non-success statuses, idle
    /// timeouts, or when the stream ends short of `spec.expected_len`.
    fn fetch(
        &self,
        spec: FetchSpec,
        on_chunk: ProgressSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<()>>;
}

/// Unpacks one archive into a destination directory.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `destination`, creating the directory when
    /// missing.
    ///
    /// # Returns
    ///
    /// The number of files found under `destination` after extraction.
    ///
    /// # Errors
    ///
    /// Returns an error when the destination cannot be created or the
    /// archive tool fails.
    fn extract(&self, archive: &Path, destination: &Path) -> Result<usize>;
}

/// Lifecycle event reported to an [`EventTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedEvent {
    /// A file finished transferring and passed its integrity check.
    Download,
    /// An archive was extracted.
    Decompress,
}

impl TrackedEvent {
    /// Stable label for logs and telemetry sinks.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedEvent::Download => "download",
            TrackedEvent::Decompress => "decompress",
        }
    }
}

/// Receives a notification after each successful download or extraction.
pub trait EventTracker: Send + Sync {
    /// Record that `event` happened for `record`.
    fn track(&self, record: &JobRecord, event: TrackedEvent);
}

/// Tracker that discards all events. The default when no tracker is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl EventTracker for NoopTracker {
    fn track(&self, _record: &JobRecord, _event: TrackedEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::FileJob;

    #[test]
    fn test_tracked_event_labels() {
        assert_eq!(TrackedEvent::Download.as_str(), "download");
        assert_eq!(TrackedEvent::Decompress.as_str(), "decompress");
    }

    #[test]
    fn test_noop_tracker_accepts_events() {
        let tracker = NoopTracker;
        let record = JobRecord::new(FileJob::new("http://h/f", "/d", "f"));
        tracker.track(&record, TrackedEvent::Download);
        tracker.track(&record, TrackedEvent::Decompress);
    }

    #[test]
    fn test_remote_info_equality() {
        let a = RemoteInfo {
            total_size: 10,
            fingerprint: Some("abc".into()),
        };
        assert_eq!(a, a.clone());
        assert_ne!(
            a,
            RemoteInfo {
                total_size: 10,
                fingerprint: None,
            }
        );
    }
}
