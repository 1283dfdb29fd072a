//! bulkdl - batch downloader command-line interface.
//!
//! This binary wraps the `bulkdl` library: it turns URLs or a JSON manifest
//! into a download batch, renders aggregate progress, and maps Ctrl+C to a
//! clean session stop.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::fetch::{self, FetchArgs};
use commands::manifest::{self, ManifestArgs};

/// Batch HTTP(S) downloader with resume, integrity checks and extraction.
#[derive(Debug, Parser)]
#[command(name = "bulkdl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download one or more URLs
    Fetch(FetchArgs),
    /// Download a batch described by a JSON manifest
    Manifest(ManifestArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Fetch(args) => fetch::run(args).await,
        Commands::Manifest(args) => manifest::run(args).await,
    };

    if let Err(err) = result {
        eprintln!("{} {err}", style("error:").red().bold());
        std::process::exit(1);
    }
}
