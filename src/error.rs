//! Error types shared by the sorter engine, its configuration layer and the updater.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting sorter settings.
///
/// Loading never fails: unreadable or malformed settings fall back to the
/// default seed. Only writes surface errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error while reading or writing the settings file.
    #[error("IO error on settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Settings could not be serialized.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that stop a sort pass before any file is moved.
///
/// Individual move failures are not errors at this level; they are
/// collected in the [`SortReport`](crate::file_organizer::SortReport).
#[derive(Debug, Error)]
pub enum SortError {
    /// The target directory is missing or not a directory.
    #[error("Invalid target directory {path}: {source}")]
    InvalidTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The target directory could not be listed.
    #[error("Error reading directory {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A category folder could not be created.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for sort operations.
pub type SortResult<T> = Result<T, SortError>;

/// Errors raised by the updater. Every variant is fatal for the current pass.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Neither a manifest URL nor a release-listing URL was supplied.
    #[error("No update source provided. Pass --manifest-url or --release-api-url.")]
    Configuration,
    /// A download failed.
    #[error("Failed to download {url}: {reason}")]
    Network { url: String, reason: String },
    /// A required document was malformed or lacked a field.
    #[error("Invalid {what}: {reason}")]
    Parse { what: String, reason: String },
    /// No release asset matched the detected platform.
    #[error("No suitable installer found for your platform\nDetected: {platform}")]
    AssetSelection { platform: String },
    /// The installer ran but reported failure.
    #[error("{message}\nStdout: {stdout}\nStderr: {stderr}")]
    Installation {
        message: String,
        stdout: String,
        stderr: String,
    },
    /// The installer process did not start in time.
    #[error("Failed to start installer {program} within {seconds}s")]
    StartTimeout { program: String, seconds: u64 },
    /// The installer process did not finish in time and was killed.
    #[error("Installation timed out after {seconds}s\nStdout: {stdout}\nStderr: {stderr}")]
    RunTimeout {
        seconds: u64,
        stdout: String,
        stderr: String,
    },
    /// The user declined the update.
    #[error("Update to {version} declined")]
    Declined { version: String },
    /// Local filesystem error while staging or installing.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for updater operations.
pub type UpdateResult<T> = Result<T, UpdateError>;
