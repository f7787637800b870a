//! dlsort - sort a download folder into category subfolders
//!
//! This library provides the sort engine (rule matching, collision-safe
//! destinations, folder provisioning and partial-failure-tolerant moves),
//! the persisted settings it runs from, progress reporting, and a
//! self-updater that picks and launches the right installer per platform.

pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod progress;
pub mod updater;

pub use config::{ConfigRepository, Settings};
pub use error::{ConfigError, SortError, UpdateError};
pub use file_category::{CategoryRule, CategoryRuleSet, Classification, IgnorePatterns};
pub use file_organizer::{MovePlan, SortEngine, SortOptions, SortReport, spawn_sort};
pub use progress::{ChannelObserver, ProgressEvent, ProgressObserver};
pub use updater::{UpdateOutcome, UpdateState, Updater, UpdaterConfig};

pub use cli::{SortCommand, run_cli};
