use clap::Parser;
use dlsort::UpdateError;
use dlsort::cli::{UpdateCommand, run_update_cli};
use dlsort::output::Console;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Check for a newer release and install it.
#[derive(Parser, Debug)]
#[command(name = "dlsort-update", version, about)]
struct Cli {
    /// URL of a remote manifest.json carrying the latest version
    #[arg(short, long, value_name = "URL")]
    manifest_url: Option<String>,

    /// URL of a release listing with tag_name and assets
    #[arg(short = 'a', long, value_name = "URL")]
    release_api_url: Option<String>,

    /// Installer download URL; `%1` or `{version}` is replaced by the version
    #[arg(short = 't', long, value_name = "TEMPLATE")]
    installer_template: Option<String>,

    /// Package name used to pick a release asset
    #[arg(short, long, value_name = "NAME")]
    package_name: Option<String>,

    /// Directory holding the local manifest.json
    #[arg(long, value_name = "DIR")]
    manifest_dir: Option<PathBuf>,

    /// Install without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let command = UpdateCommand {
        manifest_url: cli.manifest_url,
        release_api_url: cli.release_api_url,
        installer_template: cli.installer_template,
        package_name: cli.package_name,
        manifest_dir: cli.manifest_dir,
        assume_yes: cli.yes,
    };

    match run_update_cli(&command) {
        Ok(_) => ExitCode::SUCCESS,
        Err(UpdateError::Declined { version }) => {
            Console::info(&format!("Update to {} cancelled", version));
            ExitCode::SUCCESS
        }
        Err(e @ UpdateError::Configuration) => {
            Console::error(&e.to_string());
            ExitCode::from(2)
        }
        Err(e) => {
            Console::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
