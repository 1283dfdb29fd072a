//! Error types for the download engine.
//!
//! Every failure that can abort a session is represented here. The engine has
//! no per-file partial-success mode: the first unrecoverable error cancels all
//! sibling transfers, resets the session state, and surfaces to the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, DownloadError>;

/// Errors that can abort a download session.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Bad call-site usage, rejected before any work starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The remote answered with a status outside the success range.
    #[error("remote returned status {status} for {url}")]
    RemoteUnavailable { url: String, status: u16 },

    /// Transport-level failure while probing or fetching.
    #[error("network failure for {url}: {reason}")]
    Network { url: String, reason: String },

    /// A single transfer exceeded its idle/connect timeout.
    #[error("transfer of {url} timed out after {timeout_ms} ms")]
    TransferTimeout { url: String, timeout_ms: u64 },

    /// The response body ended before the expected byte count arrived.
    #[error("incomplete transfer of {}: expected {expected} bytes, wrote {actual}", path.display())]
    IncompleteTransfer {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// A completed file failed its fingerprint check and was deleted.
    #[error("fingerprint mismatch for {}", path.display())]
    CorruptFile { path: PathBuf },

    /// A file flagged for extraction was missing when post-processing ran.
    #[error("archive missing before extraction: {}", path.display())]
    ExtractionSourceMissing { path: PathBuf },

    /// The archive extractor rejected the file.
    #[error("failed to extract {}: {reason}", path.display())]
    DecompressionFailed { path: PathBuf, reason: String },

    /// Filesystem failure while reconciling, writing, or cleaning up.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }

    /// Error used when an in-flight request is torn down by `stop()`. It never
    /// reaches the caller: a stopped session resolves as stopped, not failed.
    pub(crate) fn aborted(url: impl Into<String>) -> Self {
        DownloadError::Network {
            url: url.into(),
            reason: "request aborted".to_string(),
        }
    }
}
