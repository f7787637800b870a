//! Dotted numeric versions and the local manifest.

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Version assumed when no local manifest can be read.
pub const FALLBACK_VERSION: &str = "0.0.0";

/// Name of the manifest that sits next to the executable.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A dotted numeric version such as `1.10.2`.
///
/// Comparison is per segment and numeric; the shorter version is padded
/// with zeros, so `1.2` equals `1.2.0`.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parses a version leniently.
    ///
    /// Each segment keeps its leading digits (`3-beta` reads as `3`).
    /// Parsing stops at the first segment without leading digits; input with
    /// no numeric segment at all reads as `0`.
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        for part in input.trim().split('.') {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            match digits.parse::<u64>() {
                Ok(n) => segments.push(n),
                Err(_) => break,
            }
            if digits.len() != part.len() {
                break;
            }
        }
        if segments.is_empty() {
            segments.push(0);
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| {
                let a = self.segments.get(i).copied().unwrap_or(0);
                let b = other.segments.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Compares two version strings. An update is due when this returns `Less`.
pub fn compare_versions(local: &str, remote: &str) -> Ordering {
    Version::parse(local).cmp(&Version::parse(remote))
}

#[derive(Debug, Deserialize)]
struct Manifest {
    version: String,
}

/// Reads the `version` field of a manifest document.
///
/// Returns `None` for malformed JSON or a missing/empty field.
pub fn version_from_manifest(content: &str) -> Option<String> {
    serde_json::from_str::<Manifest>(content)
        .ok()
        .map(|m| m.version.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Directory of the running executable, or the current directory.
pub fn default_manifest_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Reads the local version from `<dir>/manifest.json`.
///
/// A missing or unreadable manifest yields [`FALLBACK_VERSION`], so any
/// remote version counts as newer.
pub fn read_local_version(dir: &Path) -> String {
    let path = dir.join(MANIFEST_FILE);
    match fs::read_to_string(&path) {
        Ok(content) => version_from_manifest(&content).unwrap_or_else(|| {
            tracing::debug!(path = %path.display(), "local manifest has no usable version");
            FALLBACK_VERSION.to_string()
        }),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no local manifest");
            FALLBACK_VERSION.to_string()
        }
    }
}
