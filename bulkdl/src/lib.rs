//! # bulkdl
//!
//! A batch HTTP(S) download engine with resume, integrity checking and
//! post-download extraction.
//!
//! ## Features
//!
//! - **Size probing**: Every file's remote size and fingerprint is fetched
//!   before any transfer starts, so progress is accurate from the first byte
//! - **Whole-file resume**: Partial downloads continue from their current
//!   byte offset via HTTP Range requests
//! - **Bounded concurrency**: A worker pool caps simultaneous transfers and
//!   greedily refills slots; the first failure aborts the whole batch
//! - **Aggregated progress**: One callback stream for the entire batch, with
//!   a throttled transfer-speed sample
//! - **Integrity checks**: Finished files are verified against the server's
//!   `Content-MD5`; corrupt files are deleted for a clean restart
//! - **Extraction**: Files flagged for decompression are unpacked after the
//!   batch completes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulkdl::{DownloadManager, FileJob, ManagerConfig, SessionOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = DownloadManager::new(ManagerConfig::default());
//!
//!     let jobs = vec![
//!         FileJob::new("https://example.com/data.zip", "/tmp/downloads", "data.zip")
//!             .with_decompression(None),
//!     ];
//!
//!     let outcome = manager
//!         .start(
//!             jobs,
//!             Box::new(|update| {
//!                 println!("{} {:.2}%", update.speed, update.percent);
//!             }),
//!         )
//!         .await?;
//!
//!     match outcome {
//!         SessionOutcome::Completed(summary) => {
//!             println!("downloaded {} files", summary.files_downloaded);
//!         }
//!         SessionOutcome::Stopped => println!("stopped before finishing"),
//!     }
//!
//!     Ok(())
//! }
//! ```

// Modules
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod integrity;
pub mod job;
pub mod pool;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod traits;
pub mod transfer;

// Re-exports for convenience
pub use config::{
    ManagerConfig, DEFAULT_MAX_PARALLEL, DEFAULT_PROGRESS_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
pub use error::{DownloadError, Result};
pub use job::{FileJob, JobRecord, JobStatus};
pub use session::{DownloadManager, Phase, SessionOutcome, SessionSummary};

// Progress exports
pub use progress::{format_bytes, percent, ProgressAggregator, ProgressCallback, ProgressUpdate};

// Collaborator seams
pub use extract::ShellExtractor;
pub use http::HttpTransport;
pub use traits::{
    ArchiveExtractor, BoxFuture, EventTracker, FetchSpec, NoopTracker, ProgressSink, RemoteInfo,
    TrackedEvent, Transport,
};
