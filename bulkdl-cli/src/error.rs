//! Error types for CLI commands.

use std::fmt;

use bulkdl::DownloadError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad command-line usage.
    Usage(String),
    /// The manifest file could not be read or parsed.
    Manifest(String),
    /// The download engine failed.
    Download(DownloadError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Manifest(msg) => write!(f, "manifest error: {msg}"),
            CliError::Download(err) => write!(f, "download failed: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Download(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DownloadError> for CliError {
    fn from(err: DownloadError) -> Self {
        CliError::Download(err)
    }
}
