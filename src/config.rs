//! Persisted sorter settings.
//!
//! Settings live in a single JSON file owned by [`ConfigRepository`]. The
//! repository seeds defaults on first run, migrates older layouts once, and
//! hands out [`Settings`] that the sorter consumes read-only.
//!
//! # Settings File Format
//!
//! ```json
//! {
//!   "mappings": [
//!     { "folder": "Downloaded Images", "extensions": ["png", "jpg"] }
//!   ],
//!   "ignorePatterns": ["\\.part$"],
//!   "sortDirectories": true
//! }
//! ```
//!
//! Two older layouts are still understood and rewritten on load: a bare
//! array of `{folder, extensions}` objects, and an object carrying
//! `defaults` and `custom` rule sections.

use crate::error::ConfigError;
use crate::file_category::{CategoryRule, CategoryRuleSet, IgnorePatterns};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Sorter settings in their current on-disk shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Category rules, in match order.
    #[serde(default)]
    pub mappings: Vec<CategoryRule>,

    /// Regex patterns for entries to leave alone.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether subdirectories are moved into the overflow folder.
    #[serde(default = "default_sort_directories")]
    pub sort_directories: bool,
}

fn default_sort_directories() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mappings: default_mappings(),
            ignore_patterns: Vec::new(),
            sort_directories: true,
        }
    }
}

impl Settings {
    /// Builds the rule set used by the sorter.
    pub fn rule_set(&self) -> CategoryRuleSet {
        CategoryRuleSet::new(self.mappings.clone())
    }

    /// Compiles ignore patterns, dropping invalid ones.
    pub fn compile_ignore_patterns(&self) -> IgnorePatterns {
        IgnorePatterns::compile(&self.ignore_patterns)
    }

    /// Normalizes every rule and drops unusable ones, keeping order.
    fn normalized(mut self) -> Self {
        self.mappings = CategoryRuleSet::new(self.mappings).rules().to_vec();
        self
    }
}

/// Rules seeded on first run.
pub fn default_mappings() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Downloaded Archives", ["zip", "rar", "7z"]),
        CategoryRule::new("Downloaded Audios", ["m4a", "mp3", "wav", "aac"]),
        CategoryRule::new(
            "Downloaded Documents",
            ["doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "pdf", "rtf"],
        ),
        CategoryRule::new("Downloaded Fonts", ["otf", "ttf"]),
        CategoryRule::new(
            "Downloaded Images",
            ["png", "jpeg", "jpg", "gif", "tiff", "psd", "ai", "eps"],
        ),
        CategoryRule::new("Downloaded Programs", ["exe", "msi"]),
        CategoryRule::new("Downloaded Videos", ["mp4", "mov", "wmv", "avi", "mkv"]),
    ]
}

/// Result of interpreting a settings document.
#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    /// Already in the current layout.
    Current(Settings),
    /// Converted from an older layout; must be written back.
    Migrated(Settings),
    /// Not usable; seed defaults.
    Invalid,
}

/// Owns loading and saving of the settings file.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    path: PathBuf,
}

impl ConfigRepository {
    /// Creates a repository backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Repository at the platform config location,
    /// `<config_dir>/DownloadSorter/mappings.json`.
    ///
    /// Falls back to the current directory when the platform has no config dir.
    pub fn at_default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("DownloadSorter").join("mappings.json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings.
    ///
    /// A missing, unreadable, malformed or empty file is replaced by the
    /// default seed, which is written back. Older layouts are migrated and
    /// persisted in the current layout. Write failures during seeding or
    /// migration are logged and do not fail the load.
    pub fn load(&self) -> Settings {
        match self.read() {
            Parsed::Current(settings) => settings,
            Parsed::Migrated(settings) => {
                tracing::info!(path = %self.path.display(), "migrated legacy settings layout");
                self.persist_quietly(&settings);
                settings
            }
            Parsed::Invalid => {
                let settings = Settings::default();
                self.persist_quietly(&settings);
                settings
            }
        }
    }

    /// Loads settings like [`ConfigRepository::load`] without writing
    /// anything back. Used by dry runs.
    pub fn peek(&self) -> Settings {
        match self.read() {
            Parsed::Current(settings) | Parsed::Migrated(settings) => settings,
            Parsed::Invalid => Settings::default(),
        }
    }

    fn read(&self) -> Parsed {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(doc) => Self::migrate_legacy(doc),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "settings file is not valid JSON");
                    Parsed::Invalid
                }
            },
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "settings file unavailable");
                Parsed::Invalid
            }
        }
    }

    /// Writes settings in the current layout, creating parent directories.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json).map_err(|e| ConfigError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn persist_quietly(&self, settings: &Settings) {
        if let Err(e) = self.save(settings) {
            tracing::warn!(error = %e, "could not write settings");
        }
    }

    /// Interprets a settings document in any known layout.
    ///
    /// Empty rule lists are treated as invalid so the caller seeds defaults.
    fn migrate_legacy(doc: Value) -> Parsed {
        match doc {
            Value::Array(_) => {
                let mappings = parse_rules(&doc);
                if mappings.is_empty() {
                    return Parsed::Invalid;
                }
                Parsed::Migrated(Settings {
                    mappings,
                    ignore_patterns: Vec::new(),
                    sort_directories: true,
                })
            }
            Value::Object(ref obj) if !obj.contains_key("mappings") => {
                let custom = obj.get("custom").map(parse_rules).unwrap_or_default();
                let defaults = obj.get("defaults").map(parse_rules).unwrap_or_default();
                let chosen = if custom.is_empty() { defaults } else { custom };
                if chosen.is_empty() {
                    return Parsed::Invalid;
                }
                Parsed::Migrated(Settings {
                    mappings: chosen,
                    ignore_patterns: Vec::new(),
                    sort_directories: true,
                })
            }
            Value::Object(_) => match serde_json::from_value::<Settings>(doc) {
                Ok(settings) => {
                    let settings = settings.normalized();
                    if settings.mappings.is_empty() {
                        Parsed::Invalid
                    } else {
                        Parsed::Current(settings)
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "settings file has an unexpected shape");
                    Parsed::Invalid
                }
            },
            _ => Parsed::Invalid,
        }
    }
}

/// Reads a JSON array of `{folder, extensions}` objects leniently.
///
/// Entries that are not objects, or lack a folder or extensions, are skipped.
fn parse_rules(value: &Value) -> Vec<CategoryRule> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let rules = items
        .iter()
        .filter_map(|item| {
            let folder = item.get("folder")?.as_str()?;
            let extensions = item
                .get("extensions")?
                .as_array()?
                .iter()
                .filter_map(Value::as_str);
            Some(CategoryRule::new(folder, extensions))
        })
        .collect();
    CategoryRuleSet::new(rules).rules().to_vec()
}
