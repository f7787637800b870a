/// Category rules for routing downloaded files into subfolders.
///
/// A rule set maps category folder names to the lowercase extensions they
/// collect. Rules are kept in the order they were configured and the first
/// folder whose set contains an extension wins.
///
/// # Examples
///
/// ```
/// use dlsort::file_category::{CategoryRule, CategoryRuleSet};
///
/// let rules = CategoryRuleSet::new(vec![
///     CategoryRule::new("Docs", ["pdf", "TXT"]),
///     CategoryRule::new("Pics", ["png"]),
/// ]);
/// assert_eq!(rules.folder_for_extension("PDF"), Some("Docs"));
/// assert_eq!(rules.folder_for_extension("txt"), Some("Docs"));
/// assert_eq!(rules.folder_for_extension("exe"), None);
/// ```
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Destination for every directory entry when directory sorting is enabled.
pub const OVERFLOW_FOLDER: &str = "Downloaded Folders";

/// Folder an older release nested rule folders under.
pub const LEGACY_NESTED_FOLDER: &str = "Download Folders";

/// Folders the sorter never touches, besides the configured rule folders.
pub const BUILTIN_RESERVED: &[&str] = &[
    "Downloaded Archives",
    "Downloaded Audios",
    "Downloaded Documents",
    "Downloaded Fonts",
    "Downloaded Images",
    "Downloaded Programs",
    "Downloaded Videos",
    "IDM Roaming",
    "Telegram Desktop",
    "Tixati",
    LEGACY_NESTED_FOLDER,
];

/// One category folder and the extensions routed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Folder name, created directly under the target directory.
    pub folder: String,
    /// Lowercase extensions without a leading dot.
    pub extensions: Vec<String>,
}

impl CategoryRule {
    /// Creates a rule, normalizing the extensions.
    ///
    /// Extensions are lowercased and stripped of a leading dot; empty
    /// entries and duplicates are dropped while keeping the first occurrence.
    pub fn new<I, S>(folder: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rule = Self {
            folder: folder.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_string())
                .collect(),
        };
        rule.normalize();
        rule
    }

    /// Normalizes extensions in place. See [`CategoryRule::new`].
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.folder = self.folder.trim().to_string();
        self.extensions = self
            .extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty() && seen.insert(ext.clone()))
            .collect();
    }

    /// Returns true if this rule has a folder name and at least one extension.
    pub fn is_usable(&self) -> bool {
        !self.folder.is_empty() && !self.extensions.is_empty()
    }

    /// Returns true if `extension` (any case) belongs to this rule.
    pub fn matches(&self, extension: &str) -> bool {
        let ext = extension.to_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }
}

/// Ordered collection of category rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRuleSet {
    rules: Vec<CategoryRule>,
}

impl CategoryRuleSet {
    /// Builds a rule set, normalizing each rule and dropping unusable ones.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.normalize();
                rule
            })
            .filter(CategoryRule::is_usable)
            .collect();
        Self { rules }
    }

    /// Returns the rules in configured order.
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Returns true if no usable rule is configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates over the folder names in configured order.
    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.folder.as_str())
    }

    /// Returns the first folder whose extension set contains `extension`.
    pub fn folder_for_extension(&self, extension: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(extension))
            .map(|rule| rule.folder.as_str())
    }

    /// Names that must never be sorted: the rule folders, the overflow
    /// folder and the built-in reserved list.
    pub fn reserved_names(&self) -> HashSet<String> {
        self.folders()
            .chain(std::iter::once(OVERFLOW_FOLDER))
            .chain(BUILTIN_RESERVED.iter().copied())
            .map(str::to_string)
            .collect()
    }
}

/// Compiled ignore patterns, matched against entry names.
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    regexes: Vec<Regex>,
}

impl IgnorePatterns {
    /// Compiles the given patterns, silently dropping the invalid ones.
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let regexes = patterns
            .into_iter()
            .filter_map(|pattern| match Regex::new(pattern.as_ref()) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::debug!(pattern = pattern.as_ref(), error = %e, "dropping invalid ignore pattern");
                    None
                }
            })
            .collect();
        Self { regexes }
    }

    /// Number of patterns that compiled.
    pub fn len(&self) -> usize {
        self.regexes.len()
    }

    /// Returns true if no pattern compiled.
    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty()
    }

    /// Returns true if `name` matches any pattern.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(name))
    }
}

/// Why an entry is or is not moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Move the entry into this category folder.
    Move { folder: String },
    /// The entry is one of the sorter's own folders.
    Reserved,
    /// The entry name matched an ignore pattern.
    Ignored,
    /// A file whose extension no rule claims; left in place.
    Unrecognized,
    /// A directory, while directory sorting is disabled.
    DirectoryDisabled,
}

impl Classification {
    /// Returns the destination folder for entries that will be moved.
    pub fn folder(&self) -> Option<&str> {
        match self {
            Classification::Move { folder } => Some(folder),
            _ => None,
        }
    }
}

/// Returns the lowercase text after the last dot of a file name.
///
/// Names without a dot, or with only a leading dot (`.bashrc`), have no
/// extension.
pub fn extension_of(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx + 1..].to_lowercase()),
        _ => None,
    }
}
