//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use bulkdl::{format_bytes, DownloadManager, FileJob, ManagerConfig, SessionOutcome};

use crate::error::CliError;

/// Tuning flags shared by every download command.
#[derive(Debug, Args)]
pub struct SessionOptions {
    /// Maximum simultaneous transfers
    #[arg(long, default_value_t = bulkdl::DEFAULT_MAX_PARALLEL)]
    pub parallel: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = bulkdl::DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

impl SessionOptions {
    /// Convert CLI flags into an engine configuration.
    pub fn to_config(&self) -> ManagerConfig {
        ManagerConfig::new()
            .with_max_parallel(self.parallel)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// Directory downloads land in when `--dir` is not given.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Derive a local filename from the last path segment of a URL.
pub fn filename_from_url(url: &str) -> Result<String, CliError> {
    let trimmed = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let name = trimmed.rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        return Err(CliError::Usage(format!(
            "cannot derive a filename from {url}; use a manifest to name the file"
        )));
    }
    Ok(name.to_string())
}

/// Progress bar spanning the whole batch.
fn make_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar
}

/// Drive one download session with a progress bar and Ctrl+C handling.
pub async fn run_session(jobs: Vec<FileJob>, options: &SessionOptions) -> Result<(), CliError> {
    let manager = Arc::new(DownloadManager::new(options.to_config()));

    // Ctrl+C stops the session; in-flight requests cancel and the session
    // resolves as stopped rather than failed.
    {
        let manager = Arc::clone(&manager);
        ctrlc::set_handler(move || {
            eprintln!();
            eprintln!("Stopping; cancelling in-flight requests...");
            tracing::info!("Stop requested, cancelling session");
            manager.stop();
        })
        .map_err(|e| CliError::Usage(format!("Failed to set signal handler: {}", e)))?;
    }

    tracing::info!(
        files = jobs.len(),
        parallel = options.parallel,
        "Starting download session"
    );
    println!("Downloading {} file(s)", jobs.len());
    println!("Press Ctrl+C to stop");
    println!();

    let bar = make_progress_bar();
    let callback = {
        let bar = bar.clone();
        Box::new(move |update: bulkdl::ProgressUpdate| {
            bar.set_length(update.total_bytes);
            bar.set_position(update.bytes_completed);
            bar.set_message(update.speed);
        })
    };

    match manager.start(jobs, callback).await? {
        SessionOutcome::Completed(summary) => {
            bar.finish_and_clear();
            tracing::info!(
                files = summary.files_downloaded,
                extracted = summary.files_extracted,
                "Session complete"
            );
            println!("Session Summary");
            println!("───────────────");
            println!("  Files downloaded: {}", summary.files_downloaded);
            println!(
                "  Data transferred: {}",
                format_bytes(summary.bytes_transferred)
            );
            println!("  Batch size:       {}", format_bytes(summary.bytes_total));
            if summary.files_extracted > 0 {
                println!("  Archives unpacked: {}", summary.files_extracted);
            }
            println!();
            println!("{}", style("Done.").green());
            Ok(())
        }
        SessionOutcome::Stopped => {
            bar.abandon();
            tracing::info!("Session stopped before finishing");
            println!();
            println!("{}", style("Stopped before finishing.").yellow());
            Ok(())
        }
    }
}
