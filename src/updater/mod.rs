//! Self-update: find a newer release, pick its installer, run it.
//!
//! A pass moves through [`UpdateState`] in order:
//! `Idle → FetchingVersionInfo → ComparingVersions → (UpToDate | SelectingAsset
//! → Downloading → Installing) → Done`, dropping to `Error` from any step
//! that fails. Nothing is cached between passes.

pub mod asset;
pub mod installer;
pub mod source;
pub mod version;

use crate::error::{UpdateError, UpdateResult};
use asset::{DEFAULT_PACKAGE_NAME, Platform, choose_asset};
use installer::{InstallOutcome, Installer, Timeouts};
use source::{HttpFetcher, UpdateSources, resolve_remote};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Steps of an update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    FetchingVersionInfo,
    ComparingVersions,
    UpToDate,
    SelectingAsset,
    Downloading,
    Installing,
    Done,
    Error,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Settings for one updater pass.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub sources: UpdateSources,
    /// Name used to match release assets.
    pub package_name: String,
    /// Directory holding the local `manifest.json`.
    pub manifest_dir: PathBuf,
    /// Where installers are downloaded to.
    pub download_dir: PathBuf,
    pub platform: Platform,
    pub timeouts: Timeouts,
}

impl UpdaterConfig {
    /// Config for the running machine with the given sources.
    pub fn new(sources: UpdateSources) -> Self {
        Self {
            sources,
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            manifest_dir: version::default_manifest_dir(),
            download_dir: std::env::temp_dir().join("dlsort-update"),
            platform: Platform::current(),
            timeouts: Timeouts::default(),
        }
    }
}

/// How a successful pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate { local: String, remote: String },
    Installed {
        version: String,
        installer: PathBuf,
        outcome: InstallOutcome,
    },
}

/// Runs update passes.
pub struct Updater<'a> {
    config: UpdaterConfig,
    fetcher: &'a dyn HttpFetcher,
    installer: Box<dyn Installer>,
    state: UpdateState,
    transitions: Vec<UpdateState>,
}

impl<'a> Updater<'a> {
    /// Creates an updater using the platform's installer strategy.
    pub fn new(config: UpdaterConfig, fetcher: &'a dyn HttpFetcher) -> Self {
        let installer = installer::for_platform(config.platform, config.timeouts);
        Self::with_installer(config, fetcher, installer)
    }

    /// Creates an updater with an explicit installer strategy.
    pub fn with_installer(
        config: UpdaterConfig,
        fetcher: &'a dyn HttpFetcher,
        installer: Box<dyn Installer>,
    ) -> Self {
        Self {
            config,
            fetcher,
            installer,
            state: UpdateState::Idle,
            transitions: vec![UpdateState::Idle],
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn transitions(&self) -> &[UpdateState] {
        &self.transitions
    }

    fn enter(&mut self, state: UpdateState) {
        tracing::info!(from = %self.state, to = %state, "updater state");
        self.state = state;
        self.transitions.push(state);
    }

    /// Runs one pass.
    ///
    /// `confirm` is asked with the local and remote versions before anything
    /// is downloaded; returning false ends the pass with
    /// [`UpdateError::Declined`].
    pub fn run(
        &mut self,
        confirm: &mut dyn FnMut(&str, &str) -> bool,
    ) -> UpdateResult<UpdateOutcome> {
        let result = self.run_inner(confirm);
        match &result {
            Ok(_) => self.enter(UpdateState::Done),
            Err(UpdateError::Declined { .. }) => self.enter(UpdateState::Done),
            Err(e) => {
                tracing::error!(error = %e, "update failed");
                self.enter(UpdateState::Error);
            }
        }
        result
    }

    fn run_inner(
        &mut self,
        confirm: &mut dyn FnMut(&str, &str) -> bool,
    ) -> UpdateResult<UpdateOutcome> {
        self.config.sources.validate()?;

        self.enter(UpdateState::FetchingVersionInfo);
        let remote = resolve_remote(self.fetcher, &self.config.sources)?;
        let local = version::read_local_version(&self.config.manifest_dir);

        self.enter(UpdateState::ComparingVersions);
        if version::compare_versions(&local, &remote.version) != Ordering::Less {
            self.enter(UpdateState::UpToDate);
            return Ok(UpdateOutcome::UpToDate {
                local,
                remote: remote.version,
            });
        }
        if !confirm(&local, &remote.version) {
            return Err(UpdateError::Declined {
                version: remote.version,
            });
        }

        self.enter(UpdateState::SelectingAsset);
        let url = if remote.assets.is_empty() {
            self.config
                .sources
                .installer_url(&remote.version)
                .ok_or_else(|| UpdateError::AssetSelection {
                    platform: self.config.platform.to_string(),
                })?
        } else {
            choose_asset(&remote.assets, &self.config.package_name, self.config.platform)?
                .browser_download_url
                .clone()
        };

        self.enter(UpdateState::Downloading);
        let installer_path = self.fetcher.download_to(&url, &self.config.download_dir)?;
        tracing::info!(path = %installer_path.display(), "downloaded installer");

        self.enter(UpdateState::Installing);
        let outcome = self.installer.install(&installer_path)?;
        Ok(UpdateOutcome::Installed {
            version: remote.version,
            installer: installer_path,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::asset::LinuxFamily;
    use crate::updater::installer::InstallPlan;
    use crate::updater::source::tests::FakeFetcher;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Records installed paths instead of running anything.
    struct RecordingInstaller {
        installed: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl Installer for RecordingInstaller {
        fn plan(&self, path: &Path) -> UpdateResult<InstallPlan> {
            Ok(InstallPlan::LaunchDetached {
                program: path.to_path_buf(),
                make_executable: false,
            })
        }

        fn install(&self, path: &Path) -> UpdateResult<InstallOutcome> {
            self.installed.borrow_mut().push(path.to_path_buf());
            Ok(InstallOutcome::Launched {
                program: path.to_path_buf(),
            })
        }
    }

    const API: &str = "https://api.example.com/releases/latest";
    const RELEASE: &str = r#"{
        "tag_name": "v1.2.0",
        "assets": [
            {"name": "app.AppImage", "browser_download_url": "https://dl.example.com/app.AppImage"},
            {"name": "app_1.2.0_amd64.deb", "browser_download_url": "https://dl.example.com/app_1.2.0_amd64.deb"}
        ]
    }"#;

    fn config(dir: &TempDir, sources: UpdateSources) -> UpdaterConfig {
        UpdaterConfig {
            sources,
            package_name: "app".to_string(),
            manifest_dir: dir.path().to_path_buf(),
            download_dir: dir.path().join("downloads"),
            platform: Platform::Linux(LinuxFamily::Deb),
            timeouts: Timeouts::default(),
        }
    }

    fn api_sources() -> UpdateSources {
        UpdateSources {
            release_api_url: Some(API.to_string()),
            ..UpdateSources::default()
        }
    }

    #[test]
    fn test_update_downloads_and_installs_family_asset() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default()
            .with(API, RELEASE)
            .with("https://dl.example.com/app_1.2.0_amd64.deb", "deb-bytes");
        let installed = Rc::new(RefCell::new(Vec::new()));
        let mut updater = Updater::with_installer(
            config(&dir, api_sources()),
            &fetcher,
            Box::new(RecordingInstaller {
                installed: Rc::clone(&installed),
            }),
        );

        let outcome = updater.run(&mut |_, _| true).unwrap();
        let expected = dir.path().join("downloads").join("app_1.2.0_amd64.deb");
        match outcome {
            UpdateOutcome::Installed {
                version, installer, ..
            } => {
                assert_eq!(version, "1.2.0");
                assert_eq!(installer, expected);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(*installed.borrow(), vec![expected]);
        assert_eq!(
            updater.transitions(),
            &[
                UpdateState::Idle,
                UpdateState::FetchingVersionInfo,
                UpdateState::ComparingVersions,
                UpdateState::SelectingAsset,
                UpdateState::Downloading,
                UpdateState::Installing,
                UpdateState::Done,
            ]
        );
    }

    #[test]
    fn test_up_to_date_skips_download() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), r#"{"version": "1.2.0"}"#).unwrap();
        let fetcher = FakeFetcher::default().with(API, RELEASE);
        let mut updater = Updater::new(config(&dir, api_sources()), &fetcher);

        let outcome = updater.run(&mut |_, _| panic!("must not ask")).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::UpToDate {
                local: "1.2.0".to_string(),
                remote: "1.2.0".to_string(),
            }
        );
        assert_eq!(fetcher.requested.borrow().len(), 1);
        assert_eq!(updater.state(), UpdateState::Done);
    }

    #[test]
    fn test_missing_sources_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default();
        let mut updater = Updater::new(config(&dir, UpdateSources::default()), &fetcher);

        assert!(matches!(
            updater.run(&mut |_, _| true),
            Err(UpdateError::Configuration)
        ));
        assert!(fetcher.requested.borrow().is_empty());
        assert_eq!(updater.state(), UpdateState::Error);
    }

    #[test]
    fn test_declined_update_downloads_nothing() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default().with(API, RELEASE);
        let mut updater = Updater::new(config(&dir, api_sources()), &fetcher);

        assert!(matches!(
            updater.run(&mut |_, _| false),
            Err(UpdateError::Declined { .. })
        ));
        assert_eq!(fetcher.requested.borrow().len(), 1);
    }

    #[test]
    fn test_no_matching_asset_names_platform() {
        let dir = TempDir::new().unwrap();
        let release = r#"{"tag_name": "2.0.0", "assets": [{"name": "app.dmg", "browser_download_url": "https://dl/app.dmg"}]}"#;
        let fetcher = FakeFetcher::default().with(API, release);
        let mut updater = Updater::new(config(&dir, api_sources()), &fetcher);

        match updater.run(&mut |_, _| true) {
            Err(UpdateError::AssetSelection { platform }) => assert_eq!(platform, "linux (deb)"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(updater.state(), UpdateState::Error);
    }

    #[test]
    fn test_template_used_when_listing_absent() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default()
            .with("https://m/manifest.json", r#"{"version": "3.0.0"}"#)
            .with("https://dl/3.0.0/app-3.0.0.deb", "bytes");
        let sources = UpdateSources {
            manifest_url: Some("https://m/manifest.json".to_string()),
            release_api_url: None,
            installer_template: Some("https://dl/%1/app-%1.deb".to_string()),
        };
        let installed = Rc::new(RefCell::new(Vec::new()));
        let mut updater = Updater::with_installer(
            config(&dir, sources),
            &fetcher,
            Box::new(RecordingInstaller {
                installed: Rc::clone(&installed),
            }),
        );

        updater.run(&mut |_, _| true).unwrap();
        assert_eq!(
            *installed.borrow(),
            vec![dir.path().join("downloads").join("app-3.0.0.deb")]
        );
    }

    #[test]
    fn test_installer_download_failure_is_network_error() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default().with(API, RELEASE);
        let mut updater = Updater::new(config(&dir, api_sources()), &fetcher);

        assert!(matches!(
            updater.run(&mut |_, _| true),
            Err(UpdateError::Network { .. })
        ));
        assert_eq!(updater.state(), UpdateState::Error);
    }
}
