//! Platform detection and installer asset selection.

use super::source::ReleaseAsset;
use crate::error::{UpdateError, UpdateResult};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::fs;

/// Package name used for asset matching when none is given.
pub const DEFAULT_PACKAGE_NAME: &str = "download-sorter";

/// Optional architecture segment between the package name and extension.
const ARCH_SUFFIX: &str = r"(?:[-_](?:x86_64|amd64|64bit|\d))?";

const OS_RELEASE: &str = "/etc/os-release";

/// Linux distribution families, grouped by package format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinuxFamily {
    Deb,
    Rpm,
    Arch,
    Unknown,
}

impl fmt::Display for LinuxFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinuxFamily::Deb => "deb",
            LinuxFamily::Rpm => "rpm",
            LinuxFamily::Arch => "arch",
            LinuxFamily::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Target platform for installer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux(LinuxFamily),
    Other,
}

impl Platform {
    /// Detects the platform this binary runs on.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux(detect_linux_family())
        } else {
            Platform::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => f.write_str("windows"),
            Platform::Linux(family) => write!(f, "linux ({})", family),
            Platform::Other => f.write_str("unsupported platform"),
        }
    }
}

/// Reads `/etc/os-release` and classifies the distribution.
pub fn detect_linux_family() -> LinuxFamily {
    fs::read_to_string(OS_RELEASE)
        .map(|content| detect_linux_family_from(&content))
        .unwrap_or(LinuxFamily::Unknown)
}

/// Classifies os-release content by keyword, checked in family order.
pub fn detect_linux_family_from(os_release: &str) -> LinuxFamily {
    let data = os_release.to_lowercase();
    let has_any = |keys: &[&str]| keys.iter().any(|k| data.contains(k));
    if has_any(&["debian", "ubuntu"]) {
        LinuxFamily::Deb
    } else if has_any(&["arch", "manjaro"]) {
        LinuxFamily::Arch
    } else if has_any(&["fedora", "rhel", "centos", "suse"]) {
        LinuxFamily::Rpm
    } else {
        LinuxFamily::Unknown
    }
}

/// Ranked regex patterns for a platform, most preferred first.
pub fn asset_patterns(package_name: &str, platform: Platform) -> Vec<String> {
    let pkg = regex::escape(&package_name.to_lowercase());
    match platform {
        Platform::Windows => vec![
            format!(r"{}.*\.exe$", pkg),
            r".*setup.*\.exe$".to_string(),
            r".*installer.*\.exe$".to_string(),
            r".*\.exe$".to_string(),
        ],
        Platform::Linux(family) => {
            let with_ext = |ext: &str| format!(r"{}.*{}{}$", pkg, ARCH_SUFFIX, ext);
            let mut patterns = match family {
                LinuxFamily::Deb => vec![with_ext(r"\.deb")],
                LinuxFamily::Rpm => vec![with_ext(r"\.rpm")],
                LinuxFamily::Arch => vec![
                    with_ext(r"\.tar\.gz"),
                    with_ext(r"\.pkg\.tar\.(?:zst|gz)"),
                ],
                LinuxFamily::Unknown => Vec::new(),
            };
            patterns.extend([
                with_ext(r"\.tar\.gz"),
                with_ext(r"\.AppImage"),
                with_ext(r"\.tar\.xz"),
                with_ext(r"\.zip"),
            ]);
            patterns
        }
        Platform::Other => Vec::new(),
    }
}

/// Picks the installer asset for a platform.
///
/// Patterns are tried in rank order and, for each, assets in listing order;
/// the first hit wins. Matching is case-insensitive.
///
/// # Errors
///
/// [`UpdateError::AssetSelection`] naming the platform when nothing matches.
pub fn choose_asset<'a>(
    assets: &'a [ReleaseAsset],
    package_name: &str,
    platform: Platform,
) -> UpdateResult<&'a ReleaseAsset> {
    let patterns = asset_patterns(package_name, platform);
    tracing::debug!(package_name, %platform, ?patterns, "selecting asset");

    for pattern in &patterns {
        let Some(regex) = compile_case_insensitive(pattern) else {
            continue;
        };
        if let Some(asset) = assets.iter().find(|asset| regex.is_match(&asset.name)) {
            tracing::debug!(asset = %asset.name, %pattern, "asset matched");
            return Ok(asset);
        }
    }

    Err(UpdateError::AssetSelection {
        platform: platform.to_string(),
    })
}

fn compile_case_insensitive(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| tracing::warn!(pattern, error = %e, "skipping invalid asset pattern"))
        .ok()
}
