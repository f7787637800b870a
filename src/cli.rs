//! Command-line front ends for the sorter and the updater.
//!
//! This module wires the library together for the two binaries:
//! - loading settings and building the sort engine
//! - running a sort on a worker thread while rendering progress
//! - dry-run reporting
//! - running an update pass with an interactive confirmation

use crate::config::ConfigRepository;
use crate::error::{SortError, UpdateError};
use crate::file_organizer::{SortEngine, SortOptions, SortReport, spawn_sort};
use crate::output::{Console, ProgressBarObserver};
use crate::progress::{NullObserver, ProgressObserver};
use crate::updater::asset::DEFAULT_PACKAGE_NAME;
use crate::updater::installer::InstallOutcome;
use crate::updater::source::{ReqwestFetcher, UpdateSources};
use crate::updater::{UpdateOutcome, Updater, UpdaterConfig};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// A sort request from the command line.
#[derive(Debug, Clone)]
pub struct SortCommand {
    /// Directory to sort.
    pub target: PathBuf,
    /// Settings file; the platform default when `None`.
    pub config: Option<PathBuf>,
    /// Report the plan without moving anything.
    pub dry_run: bool,
    /// Leave subdirectories in place regardless of settings.
    pub no_directories: bool,
}

/// Builds the engine for a command from persisted settings.
pub fn build_engine(command: &SortCommand) -> SortEngine {
    let repo = command
        .config
        .as_deref()
        .map(ConfigRepository::new)
        .unwrap_or_else(ConfigRepository::at_default_location);
    tracing::debug!(path = %repo.path().display(), "loading settings");
    let settings = if command.dry_run {
        repo.peek()
    } else {
        repo.load()
    };

    SortEngine::new(
        &command.target,
        settings.rule_set(),
        settings.compile_ignore_patterns(),
        SortOptions {
            sort_directories: settings.sort_directories && !command.no_directories,
            dry_run: command.dry_run,
        },
    )
}

/// Runs a sort command and prints its results.
///
/// # Examples
///
/// ```no_run
/// use dlsort::cli::{run_cli, SortCommand};
/// use std::path::PathBuf;
///
/// let command = SortCommand {
///     target: PathBuf::from("/home/user/Downloads"),
///     config: None,
///     dry_run: true,
///     no_directories: false,
/// };
/// match run_cli(&command) {
///     Ok(report) => println!("{} entries planned", report.planned.len()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(command: &SortCommand) -> Result<SortReport, SortError> {
    let engine = build_engine(command);
    if command.dry_run {
        dry_run(engine)
    } else {
        sort(engine)
    }
}

fn sort(engine: SortEngine) -> Result<SortReport, SortError> {
    Console::info(&format!("Sorting contents of: {}", engine.target().display()));

    let (events, handle) = spawn_sort(engine);
    let mut bar = ProgressBarObserver::new();
    for event in events {
        bar.on_event(event);
    }
    bar.finish();

    let report = match handle.join() {
        Ok(result) => result?,
        Err(panic) => std::panic::resume_unwind(panic),
    };

    if !report.failed.is_empty() {
        Console::section("FAILED");
        for (path, reason) in &report.failed {
            Console::failed_move(path, reason);
        }
    }
    if !report.planned.is_empty() {
        Console::folder_summary(&report);
    }

    if report.failed.is_empty() {
        Console::success(&format!("Sorting complete! {} moved.", report.moved));
    } else {
        Console::warning(&format!(
            "{} moved, {} could not be moved. Please review errors above.",
            report.moved,
            report.failed.len()
        ));
    }
    Ok(report)
}

fn dry_run(engine: SortEngine) -> Result<SortReport, SortError> {
    Console::dry_run(&format!("Analyzing contents of: {}", engine.target().display()));
    let report = engine.run(&mut NullObserver)?;

    if report.planned.is_empty() {
        Console::plain("Nothing to move.");
        return Ok(report);
    }

    Console::section("Entries would be sorted as follows:");
    for planned in &report.planned {
        Console::planned_move(
            &display_name(&planned.source),
            relative_to(engine.target(), &planned.destination),
        );
    }
    Console::folder_summary(&report);
    Console::dry_run("Dry run complete. No files were modified.");
    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn relative_to<'a>(base: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(base).unwrap_or(path)
}

/// An update request from the command line.
#[derive(Debug, Clone, Default)]
pub struct UpdateCommand {
    pub manifest_url: Option<String>,
    pub release_api_url: Option<String>,
    pub installer_template: Option<String>,
    pub package_name: Option<String>,
    /// Directory holding the local manifest; the executable's by default.
    pub manifest_dir: Option<PathBuf>,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

impl UpdateCommand {
    /// Updater settings for this machine.
    pub fn to_config(&self) -> UpdaterConfig {
        let mut config = UpdaterConfig::new(UpdateSources {
            manifest_url: self.manifest_url.clone(),
            release_api_url: self.release_api_url.clone(),
            installer_template: self.installer_template.clone(),
        });
        config.package_name = self
            .package_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PACKAGE_NAME.to_string());
        if let Some(dir) = &self.manifest_dir {
            config.manifest_dir = dir.clone();
        }
        config
    }
}

/// Runs an update pass and prints its outcome.
pub fn run_update_cli(command: &UpdateCommand) -> Result<UpdateOutcome, UpdateError> {
    let config = command.to_config();
    // Reject a missing source before building the HTTP client.
    config.sources.validate()?;
    Console::info(&format!("Checking for updates ({})", config.platform));

    let fetcher = ReqwestFetcher::new()?;
    let mut updater = Updater::new(config, &fetcher);
    let assume_yes = command.assume_yes;
    let outcome = updater.run(&mut |local, remote| {
        assume_yes || confirm(&format!("Update from {} to {} now?", local, remote))
    })?;

    match &outcome {
        UpdateOutcome::UpToDate { local, .. } => {
            Console::success(&format!("You already have the latest version: {}", local));
        }
        UpdateOutcome::Installed {
            version,
            installer,
            outcome,
        } => {
            Console::plain(&format!("Downloaded: {}", installer.display()));
            match outcome {
                InstallOutcome::Launched { program } => Console::success(&format!(
                    "Installer for {} launched: {}",
                    version,
                    display_name(program)
                )),
                InstallOutcome::Completed { .. } => {
                    Console::success(&format!("Installation of {} finished", version))
                }
            }
        }
    }
    Ok(outcome)
}

/// Asks a yes/no question on stdin. Anything but `y`/`yes` is a no.
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_update_command_defaults_package_name() {
        let command = UpdateCommand {
            release_api_url: Some("https://api".to_string()),
            package_name: Some("  ".to_string()),
            ..UpdateCommand::default()
        };
        assert_eq!(command.to_config().package_name, DEFAULT_PACKAGE_NAME);
    }

    #[test]
    fn test_update_without_source_fails_fast() {
        let result = run_update_cli(&UpdateCommand::default());
        assert!(matches!(result, Err(UpdateError::Configuration)));
    }

    #[test]
    fn test_no_directories_overrides_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("mappings.json");
        fs::write(
            &config,
            r#"{"mappings": [{"folder": "Docs", "extensions": ["pdf"]}], "sortDirectories": true}"#,
        )
        .unwrap();

        let engine = build_engine(&SortCommand {
            target: temp_dir.path().to_path_buf(),
            config: Some(config),
            dry_run: true,
            no_directories: true,
        });
        assert!(!engine.options().sort_directories);
        assert!(engine.options().dry_run);
    }

    #[test]
    fn test_dry_run_leaves_settings_file_alone() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("settings").join("mappings.json");

        let engine = build_engine(&SortCommand {
            target: temp_dir.path().to_path_buf(),
            config: Some(config.clone()),
            dry_run: true,
            no_directories: false,
        });

        assert!(engine.options().dry_run);
        assert!(!config.exists());
        assert!(!temp_dir.path().join("settings").exists());
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/downloads");
        assert_eq!(
            relative_to(base, Path::new("/downloads/Docs/a.pdf")),
            Path::new("Docs/a.pdf")
        );
        assert_eq!(relative_to(base, Path::new("/elsewhere")), Path::new("/elsewhere"));
    }
}
