//! Remote version sources: a static manifest and a release-listing endpoint.

use super::version::version_from_manifest;
use crate::error::{UpdateError, UpdateResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_AGENT: &str = concat!("dlsort-updater/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// The parts of a release listing the updater uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseInfo {
    /// Parses a release listing. Malformed input yields an empty listing.
    pub fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "release listing is malformed, treating as empty");
            Self::default()
        })
    }

    /// Tag with a single leading `v` removed, or `None` when empty.
    pub fn version(&self) -> Option<String> {
        let tag = self.tag_name.trim();
        let stripped = tag
            .strip_prefix('v')
            .or_else(|| tag.strip_prefix('V'))
            .unwrap_or(tag);
        (!stripped.is_empty()).then(|| stripped.to_string())
    }
}

/// Blocking HTTP access, behind a trait so tests can substitute it.
pub trait HttpFetcher {
    /// Fetches a URL as text.
    fn fetch_text(&self, url: &str) -> UpdateResult<String>;

    /// Downloads a URL into `dir`, returning the written file's path.
    fn download_to(&self, url: &str, dir: &Path) -> UpdateResult<PathBuf>;
}

/// [`HttpFetcher`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new() -> UpdateResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UpdateError::Network {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> UpdateResult<reqwest::blocking::Response> {
        let network = |e: reqwest::Error| UpdateError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };
        self.client
            .get(url)
            .send()
            .map_err(network)?
            .error_for_status()
            .map_err(network)
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn fetch_text(&self, url: &str) -> UpdateResult<String> {
        tracing::debug!(url, "fetching");
        self.get(url)?.text().map_err(|e| UpdateError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn download_to(&self, url: &str, dir: &Path) -> UpdateResult<PathBuf> {
        tracing::debug!(url, dir = %dir.display(), "downloading");
        let bytes = self.get(url)?.bytes().map_err(|e| UpdateError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        fs::create_dir_all(dir).map_err(|e| UpdateError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = dir.join(file_name_from_url(url));
        fs::write(&path, &bytes).map_err(|e| UpdateError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

/// Last path segment of a URL, ignoring query and fragment.
///
/// Falls back to `download.bin` when the URL ends with a slash.
pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("download.bin")
        .to_string()
}

/// Where to look for a newer version.
#[derive(Debug, Clone, Default)]
pub struct UpdateSources {
    pub manifest_url: Option<String>,
    pub release_api_url: Option<String>,
    /// Installer URL with `%1` or `{version}` standing for the version.
    pub installer_template: Option<String>,
}

impl UpdateSources {
    /// Fails when neither a manifest nor a release listing is configured.
    pub fn validate(&self) -> UpdateResult<()> {
        let present = |url: &Option<String>| url.as_deref().is_some_and(|u| !u.trim().is_empty());
        if present(&self.manifest_url) || present(&self.release_api_url) {
            Ok(())
        } else {
            Err(UpdateError::Configuration)
        }
    }

    /// Expands the installer template for `version`, if one is configured.
    pub fn installer_url(&self, version: &str) -> Option<String> {
        self.installer_template
            .as_deref()
            .filter(|tpl| !tpl.trim().is_empty())
            .map(|tpl| tpl.replace("%1", version).replace("{version}", version))
    }
}

/// What the remote side offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersionInfo {
    pub version: String,
    /// Assets from the release listing; empty when none was fetched.
    pub assets: Vec<ReleaseAsset>,
}

/// Resolves the remote version and the downloadable assets.
///
/// The manifest, when configured, supplies the authoritative version. The
/// release listing, when configured, supplies assets and also the version
/// if the manifest gave none.
///
/// # Errors
///
/// Configuration error when no source is set; network error when any
/// configured source cannot be fetched; parse error when no source yields
/// a version.
pub fn resolve_remote(
    fetcher: &dyn HttpFetcher,
    sources: &UpdateSources,
) -> UpdateResult<RemoteVersionInfo> {
    sources.validate()?;

    let mut version = None;
    if let Some(url) = sources.manifest_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let manifest = fetcher.fetch_text(url)?;
        version = version_from_manifest(&manifest);
        if version.is_none() {
            tracing::warn!(url, "remote manifest has no version field");
        }
    }

    let mut assets = Vec::new();
    if let Some(url) = sources
        .release_api_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
    {
        let release = ReleaseInfo::parse(&fetcher.fetch_text(url)?);
        if version.is_none() {
            version = release.version();
        }
        assets = release.assets;
    }

    let version = version.ok_or_else(|| UpdateError::Parse {
        what: "remote version".to_string(),
        reason: "no version found in manifest or release listing".to_string(),
    })?;
    Ok(RemoteVersionInfo { version, assets })
}
