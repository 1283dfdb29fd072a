//! Fetch command - download one or more URLs.

use std::path::PathBuf;

use clap::Args;

use bulkdl::FileJob;

use super::common::{self, SessionOptions};
use crate::error::CliError;

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// URLs to download
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Directory downloads are written to [default: the system download directory]
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Extract each downloaded archive after the batch finishes
    #[arg(long)]
    pub extract: bool,

    /// Directory archives are extracted into [default: the download directory]
    #[arg(long, requires = "extract")]
    pub extract_to: Option<PathBuf>,

    #[command(flatten)]
    pub options: SessionOptions,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs) -> Result<(), CliError> {
    let dir = args.dir.unwrap_or_else(common::default_download_dir);

    let mut jobs = Vec::with_capacity(args.urls.len());
    for url in &args.urls {
        let filename = common::filename_from_url(url)?;
        let mut job = FileJob::new(url.as_str(), &dir, filename);
        if args.extract {
            job = job.with_decompression(args.extract_to.clone());
        }
        jobs.push(job);
    }

    common::run_session(jobs, &args.options).await
}
