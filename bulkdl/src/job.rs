//! Job data model.
//!
//! A [`FileJob`] is what the caller hands to `start()`: the remote source, the
//! local destination, and an optional extraction flag. A [`JobRecord`] wraps a
//! job with the per-session metadata the engine discovers while running
//! (remote size and fingerprint from probing, on-disk size from
//! reconciliation, transient transfer status). Records live exactly as long
//! as the session that created them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One requested file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileJob {
    /// Name of the file at the destination directory.
    pub filename: String,

    /// Local directory the file is written into. Created recursively when
    /// missing.
    pub download_path: PathBuf,

    /// Remote HTTP(S) source.
    pub file_url: String,

    /// Extract the file after the whole batch finished transferring.
    #[serde(default)]
    pub decompress: bool,

    /// Directory the archive is extracted into. Defaults to `download_path`
    /// when flagged for decompression without an explicit destination.
    #[serde(default)]
    pub decompress_destination: Option<PathBuf>,
}

impl FileJob {
    /// Create a job with no decompression step.
    pub fn new(
        file_url: impl Into<String>,
        download_path: impl Into<PathBuf>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            download_path: download_path.into(),
            file_url: file_url.into(),
            decompress: false,
            decompress_destination: None,
        }
    }

    /// Flag the job for post-download extraction.
    pub fn with_decompression(mut self, destination: Option<PathBuf>) -> Self {
        self.decompress = true;
        self.decompress_destination = destination;
        self
    }

    /// Full local path the transfer writes to.
    pub fn target_path(&self) -> PathBuf {
        self.download_path.join(&self.filename)
    }

    /// Directory the archive extracts into.
    pub fn extraction_destination(&self) -> &Path {
        self.decompress_destination
            .as_deref()
            .unwrap_or(&self.download_path)
    }
}

/// Transient transfer state of a queued record. Not persisted; exists only
/// for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting for a free transfer slot.
    Pending,
    /// Currently streaming.
    InFlight,
}

/// A job enriched with the metadata one session discovers for it.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// The caller-supplied job.
    pub job: FileJob,

    /// Authoritative remote length in bytes, filled by the size probe.
    pub total_size: u64,

    /// Content fingerprint advertised by the server (`Content-MD5`, base64).
    /// Absent means integrity cannot be verified for this file.
    pub fingerprint: Option<String>,

    /// Bytes already on disk at the target path, filled by reconciliation.
    pub current_size: u64,

    /// Transfer status while the record sits in the work queue.
    pub status: JobStatus,
}

impl JobRecord {
    /// Wrap a job with empty metadata.
    pub fn new(job: FileJob) -> Self {
        Self {
            job,
            total_size: 0,
            fingerprint: None,
            current_size: 0,
            status: JobStatus::Pending,
        }
    }

    /// Full local path the transfer writes to.
    pub fn target_path(&self) -> PathBuf {
        self.job.target_path()
    }

    /// Bytes still missing from the local file.
    pub fn remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.current_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_target_path() {
        let job = FileJob::new("https://example.com/a.bin", "/downloads", "a.bin");
        assert_eq!(job.target_path(), PathBuf::from("/downloads/a.bin"));
    }

    #[test]
    fn test_job_decompression_defaults_to_download_path() {
        let job = FileJob::new("https://example.com/a.zip", "/downloads", "a.zip")
            .with_decompression(None);
        assert!(job.decompress);
        assert_eq!(job.extraction_destination(), Path::new("/downloads"));
    }

    #[test]
    fn test_job_decompression_explicit_destination() {
        let job = FileJob::new("https://example.com/a.zip", "/downloads", "a.zip")
            .with_decompression(Some(PathBuf::from("/unpacked")));
        assert_eq!(job.extraction_destination(), Path::new("/unpacked"));
    }

    #[test]
    fn test_record_starts_pending_and_empty() {
        let record = JobRecord::new(FileJob::new("http://h/f", "/d", "f"));
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.total_size, 0);
        assert_eq!(record.current_size, 0);
        assert!(record.fingerprint.is_none());
    }

    #[test]
    fn test_record_remaining_saturates() {
        let mut record = JobRecord::new(FileJob::new("http://h/f", "/d", "f"));
        record.total_size = 100;
        record.current_size = 40;
        assert_eq!(record.remaining(), 60);

        // An oversized local file never underflows.
        record.current_size = 150;
        assert_eq!(record.remaining(), 0);
    }

    #[test]
    fn test_job_serde_round_trip_defaults() {
        let json = r#"{"filename":"a.bin","download_path":"/d","file_url":"http://h/a.bin"}"#;
        let job: FileJob = serde_json::from_str(json).unwrap();
        assert!(!job.decompress);
        assert!(job.decompress_destination.is_none());
    }
}
