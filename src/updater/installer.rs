//! Installer strategies, chosen at runtime from the detected platform.
//!
//! Each strategy turns a downloaded file into an [`InstallPlan`] and then
//! carries it out. Planning is pure so the dispatch rules can be tested
//! without launching anything.

use super::asset::Platform;
use crate::error::{UpdateError, UpdateResult};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Privilege elevation helper on Linux.
pub const ELEVATE: &str = "pkexec";

/// Entry point expected inside a `.tar.gz` installer.
pub const INSTALL_SCRIPT: &str = "install.sh";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long output readers may keep draining after a killed installer.
const CAPTURE_GRACE: Duration = Duration::from_secs(1);

/// Limits for synchronous installer processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// How long the process may take to start.
    pub start: Duration,
    /// How long it may run once started.
    pub run: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            start: Duration::from_secs(3),
            run: Duration::from_secs(60),
        }
    }
}

/// How a finished installation went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A detached process was launched; nothing waited for it.
    Launched { program: PathBuf },
    /// A synchronous installer exited successfully.
    Completed { stdout: String, stderr: String },
}

/// What to do with a downloaded installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    /// Start the file itself and return immediately.
    LaunchDetached {
        program: PathBuf,
        make_executable: bool,
    },
    /// Run a command and wait for it.
    Run { program: String, args: Vec<String> },
    /// Unpack the archive, then run its install script elevated.
    ExtractAndRunScript { archive: PathBuf, scratch: PathBuf },
}

/// Installs a downloaded update.
pub trait Installer {
    /// Decides how `path` would be installed, without side effects.
    fn plan(&self, path: &Path) -> UpdateResult<InstallPlan>;

    /// Installs `path`.
    fn install(&self, path: &Path) -> UpdateResult<InstallOutcome>;
}

/// Picks the strategy for a platform.
pub fn for_platform(platform: Platform, timeouts: Timeouts) -> Box<dyn Installer> {
    match platform {
        Platform::Windows => Box::new(WindowsInstaller),
        Platform::Linux(_) => Box::new(LinuxInstaller::new(timeouts)),
        Platform::Other => Box::new(UnsupportedInstaller),
    }
}

fn unknown_format(path: &Path) -> UpdateError {
    UpdateError::Installation {
        message: format!("Unknown installer format: {}", path.display()),
        stdout: String::new(),
        stderr: String::new(),
    }
}

/// Runs `.exe` installers detached.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsInstaller;

impl Installer for WindowsInstaller {
    fn plan(&self, path: &Path) -> UpdateResult<InstallPlan> {
        if lower_name(path).ends_with(".exe") {
            Ok(InstallPlan::LaunchDetached {
                program: path.to_path_buf(),
                make_executable: false,
            })
        } else {
            Err(unknown_format(path))
        }
    }

    fn install(&self, path: &Path) -> UpdateResult<InstallOutcome> {
        execute(self.plan(path)?, Timeouts::default())
    }
}

/// Installs Linux packages through the matching package tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxInstaller {
    timeouts: Timeouts,
}

impl LinuxInstaller {
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }
}

impl Installer for LinuxInstaller {
    fn plan(&self, path: &Path) -> UpdateResult<InstallPlan> {
        let lower = lower_name(path);
        let file = path.to_string_lossy().to_string();
        let elevated = |args: &[&str]| InstallPlan::Run {
            program: ELEVATE.to_string(),
            args: args
                .iter()
                .map(|a| a.to_string())
                .chain(std::iter::once(file.clone()))
                .collect(),
        };

        // `.pkg.tar.gz` must be checked before plain `.tar.gz`.
        let plan = if lower.ends_with(".deb") {
            elevated(&["dpkg", "-i"])
        } else if lower.ends_with(".rpm") {
            elevated(&["rpm", "-Uvh"])
        } else if lower.contains(".pkg.tar") {
            elevated(&["pacman", "-U", "--noconfirm"])
        } else if lower.ends_with(".tar.gz") {
            InstallPlan::ExtractAndRunScript {
                archive: path.to_path_buf(),
                scratch: std::env::temp_dir().join("ds-install"),
            }
        } else if lower.ends_with(".appimage") {
            InstallPlan::LaunchDetached {
                program: path.to_path_buf(),
                make_executable: true,
            }
        } else if lower.ends_with(".exe") {
            InstallPlan::LaunchDetached {
                program: path.to_path_buf(),
                make_executable: false,
            }
        } else {
            return Err(unknown_format(path));
        };
        Ok(plan)
    }

    fn install(&self, path: &Path) -> UpdateResult<InstallOutcome> {
        execute(self.plan(path)?, self.timeouts)
    }
}

/// Refuses to install anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedInstaller;

impl Installer for UnsupportedInstaller {
    fn plan(&self, _path: &Path) -> UpdateResult<InstallPlan> {
        Err(UpdateError::Installation {
            message: "Unsupported OS".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn install(&self, path: &Path) -> UpdateResult<InstallOutcome> {
        execute(self.plan(path)?, Timeouts::default())
    }
}

fn lower_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Carries out a plan.
pub fn execute(plan: InstallPlan, timeouts: Timeouts) -> UpdateResult<InstallOutcome> {
    tracing::info!(?plan, "installing");
    match plan {
        InstallPlan::LaunchDetached {
            program,
            make_executable,
        } => {
            if make_executable {
                mark_executable(&program)?;
            }
            Command::new(&program)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| UpdateError::Installation {
                    message: format!("Failed to run installer: {}", e),
                    stdout: String::new(),
                    stderr: String::new(),
                })?;
            Ok(InstallOutcome::Launched { program })
        }
        InstallPlan::Run { program, args } => {
            let mut command = Command::new(&program);
            command.args(&args);
            run_with_timeouts(command, &program, timeouts)
        }
        InstallPlan::ExtractAndRunScript { archive, scratch } => {
            extract_tar_gz(&archive, &scratch)?;
            let script = find_install_script(&scratch).ok_or_else(|| UpdateError::Installation {
                message: format!("No {} found in archive", INSTALL_SCRIPT),
                stdout: String::new(),
                stderr: String::new(),
            })?;
            mark_executable(&script)?;
            let mut command = Command::new(ELEVATE);
            command.arg("bash").arg(&script);
            if let Some(dir) = script.parent() {
                command.current_dir(dir);
            }
            run_with_timeouts(command, ELEVATE, timeouts)
        }
    }
}

/// Unpacks a gzip tarball into a fresh `scratch` directory.
pub fn extract_tar_gz(archive: &Path, scratch: &Path) -> UpdateResult<()> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| UpdateError::Io { path, source: e }
    };
    if scratch.exists() {
        fs::remove_dir_all(scratch).map_err(io_err(scratch))?;
    }
    fs::create_dir_all(scratch).map_err(io_err(scratch))?;

    let file = File::open(archive).map_err(io_err(archive))?;
    let mut tarball = tar::Archive::new(flate2::read::GzDecoder::new(file));
    tarball
        .unpack(scratch)
        .map_err(|e| UpdateError::Installation {
            message: format!("Failed to extract archive: {}", e),
            stdout: String::new(),
            stderr: String::new(),
        })
}

/// Finds `install.sh` at the top of `dir` or one directory below it.
pub fn find_install_script(dir: &Path) -> Option<PathBuf> {
    let direct = dir.join(INSTALL_SCRIPT);
    if direct.is_file() {
        return Some(direct);
    }
    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();
    subdirs
        .into_iter()
        .map(|sub| sub.join(INSTALL_SCRIPT))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> UpdateResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let io_err = |e| UpdateError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut permissions = fs::metadata(path).map_err(io_err)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(io_err)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> UpdateResult<()> {
    Ok(())
}

/// Spawns `command`, then waits for it within the configured limits,
/// capturing both output streams.
pub fn run_with_timeouts(
    mut command: Command,
    program: &str,
    timeouts: Timeouts,
) -> UpdateResult<InstallOutcome> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn_within(move || command.spawn(), program, timeouts.start)?;

    let stdout = Capture::start(child.stdout.take());
    let stderr = Capture::start(child.stderr.take());

    let status = match wait_until(&mut child, timeouts.run) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(UpdateError::RunTimeout {
                seconds: timeouts.run.as_secs(),
                stdout: stdout.finish_within(CAPTURE_GRACE),
                stderr: stderr.finish_within(CAPTURE_GRACE),
            });
        }
        Err(e) => {
            return Err(UpdateError::Io {
                path: PathBuf::from(program),
                source: e,
            });
        }
    };

    let stdout = stdout.finish();
    let stderr = stderr.finish();
    if status.success() {
        Ok(InstallOutcome::Completed { stdout, stderr })
    } else {
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Err(UpdateError::Installation {
            message: format!("Installer exited with code {}", code),
            stdout,
            stderr,
        })
    }
}

/// Runs `spawn` on a helper thread and waits up to `limit` for the child.
///
/// A child that appears after the limit has passed is killed and reaped by
/// the helper thread.
pub fn spawn_within<F>(spawn: F, program: &str, limit: Duration) -> UpdateResult<Child>
where
    F: FnOnce() -> std::io::Result<Child> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Err(mpsc::SendError(Ok(mut late))) = tx.send(spawn()) {
            tracing::warn!(pid = late.id(), "installer started after the start timeout, killing it");
            let _ = late.kill();
            let _ = late.wait();
        }
    });
    match rx.recv_timeout(limit) {
        Ok(Ok(child)) => Ok(child),
        Ok(Err(e)) => Err(UpdateError::Installation {
            message: format!("Failed to start installer {}: {}", program, e),
            stdout: String::new(),
            stderr: String::new(),
        }),
        Err(_) => Err(UpdateError::StartTimeout {
            program: program.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}

fn wait_until(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Output of one child stream, read on its own thread.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: thread::JoinHandle<()>,
}

impl Capture {
    fn start<R: Read + Send + 'static>(stream: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let reader = thread::spawn(move || {
            let Some(mut stream) = stream else {
                return;
            };
            let mut chunk = [0u8; 4096];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buffer, reader }
    }

    /// Waits for the stream to close and returns everything read.
    fn finish(self) -> String {
        let Self { buffer, reader } = self;
        let _ = reader.join();
        let bytes = buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Returns what was read once the stream closes or `grace` runs out,
    /// whichever comes first. A grandchild may hold the pipe open.
    fn finish_within(self, grace: Duration) -> String {
        let deadline = Instant::now() + grace;
        while !self.reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        self.text()
    }

    fn text(&self) -> String {
        let bytes = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
