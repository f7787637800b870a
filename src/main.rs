use anyhow::{Context, Result};
use clap::Parser;
use dlsort::cli::{SortCommand, run_cli};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sort a download folder into category subfolders.
#[derive(Parser, Debug)]
#[command(name = "dlsort", version, about)]
struct Cli {
    /// Directory to sort (defaults to the user's download directory)
    directory: Option<PathBuf>,

    /// Show what would be moved without touching anything
    #[arg(long)]
    dry_run: bool,

    /// Settings file to use instead of the per-user default
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Leave subdirectories where they are
    #[arg(long)]
    no_directories: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let target = match cli.directory {
        Some(dir) => dir,
        None => dirs::download_dir().context("Could not determine the download directory")?,
    };

    let command = SortCommand {
        target,
        config: cli.config,
        dry_run: cli.dry_run,
        no_directories: cli.no_directories,
    };
    run_cli(&command)?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
