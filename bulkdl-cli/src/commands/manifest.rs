//! Manifest command - download a batch described by a JSON file.
//!
//! A manifest is a JSON array of jobs:
//!
//! ```json
//! [
//!   {
//!     "filename": "terrain.zip",
//!     "download_path": "/data/packs",
//!     "file_url": "https://host.example/terrain.zip",
//!     "decompress": true
//!   }
//! ]
//! ```

use std::fs;
use std::path::PathBuf;

use clap::Args;

use bulkdl::FileJob;

use super::common::{self, SessionOptions};
use crate::error::CliError;

/// Arguments for the manifest command.
#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Path to a JSON array of download jobs
    pub manifest: PathBuf,

    #[command(flatten)]
    pub options: SessionOptions,
}

/// Parse a manifest file into download jobs.
fn load_jobs(path: &PathBuf) -> Result<Vec<FileJob>, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::Manifest(format!("cannot read {}: {}", path.display(), e)))?;
    let jobs: Vec<FileJob> = serde_json::from_str(&text)
        .map_err(|e| CliError::Manifest(format!("cannot parse {}: {}", path.display(), e)))?;
    if jobs.is_empty() {
        return Err(CliError::Manifest("the manifest lists no files".to_string()));
    }
    Ok(jobs)
}

/// Run the manifest command.
pub async fn run(args: ManifestArgs) -> Result<(), CliError> {
    let jobs = load_jobs(&args.manifest)?;
    common::run_session(jobs, &args.options).await
}
