//! Post-download archive extraction.
//!
//! Files flagged for decompression are unpacked after the whole batch has
//! finished transferring. Extraction shells out to system tools (unzip, tar)
//! rather than linking archive codecs into the binary; the tools are
//! universally available where this engine runs and handle format quirks
//! better than any embedded implementation.

use std::fs;
use std::path::Path;
use std::process::Command;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{DownloadError, Result};
use crate::job::JobRecord;
use crate::traits::{ArchiveExtractor, EventTracker, TrackedEvent};

/// Shell-based archive extractor.
///
/// Dispatches on the archive extension: `.zip` goes to `unzip`, everything
/// else to `tar`, which detects compression on its own.
#[derive(Debug, Default)]
pub struct ShellExtractor;

impl ShellExtractor {
    /// Create a new shell-based extractor.
    pub fn new() -> Self {
        Self
    }
}

fn tool_invocation(archive: &Path, destination: &Path) -> (&'static str, Vec<String>) {
    let is_zip = archive
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);

    if is_zip {
        (
            "unzip",
            vec![
                "-o".to_string(),
                archive.to_str().unwrap_or("").to_string(),
                "-d".to_string(),
                destination.to_str().unwrap_or("").to_string(),
            ],
        )
    } else {
        (
            "tar",
            vec![
                "-xf".to_string(),
                archive.to_str().unwrap_or("").to_string(),
                "-C".to_string(),
                destination.to_str().unwrap_or("").to_string(),
            ],
        )
    }
}

impl ArchiveExtractor for ShellExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<usize> {
        fs::create_dir_all(destination).map_err(|e| DownloadError::io(destination, e))?;

        let (tool, args) = tool_invocation(archive, destination);
        let output = Command::new(tool).args(&args).output().map_err(|e| {
            DownloadError::DecompressionFailed {
                path: archive.to_path_buf(),
                reason: format!("Failed to run {}: {}", tool, e),
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::DecompressionFailed {
                path: archive.to_path_buf(),
                reason: format!("{} extraction failed: {}", tool, stderr.trim()),
            });
        }

        count_files_recursive(destination)
    }
}

/// Drain the decompression queue, last in first out.
///
/// The queue holds every record flagged for decompression, whether its
/// archive was downloaded this session or found complete on disk. A stop
/// arriving mid-queue takes effect between archives; the one currently
/// extracting always finishes.
///
/// # Returns
///
/// The number of archives extracted.
///
/// # Errors
///
/// Fails on the first missing archive or extraction error; the remaining
/// queue is left unprocessed.
pub fn process_queue<X: ArchiveExtractor>(
    extractor: &X,
    queue: &mut Vec<JobRecord>,
    tracker: &dyn EventTracker,
    cancel: &CancellationToken,
) -> Result<usize> {
    let mut extracted = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }
        let record = match queue.pop() {
            Some(record) => record,
            None => break,
        };

        let archive = record.target_path();
        if !archive.exists() {
            return Err(DownloadError::ExtractionSourceMissing { path: archive });
        }

        let destination = record.job.extraction_destination();
        let count = extractor.extract(&archive, destination)?;
        info!(file = %record.job.filename, files = count, "archive extracted");
        tracker.track(&record, TrackedEvent::Decompress);
        extracted += 1;
    }

    Ok(extracted)
}

/// Count files recursively in a directory.
fn count_files_recursive(dir: &Path) -> Result<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| DownloadError::io(dir, e))?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}
