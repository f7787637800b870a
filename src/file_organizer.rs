/// Sort engine: moves download-folder entries into category folders.
///
/// A pass is strictly sequential: scan the target directory once, make sure
/// every category folder exists, build the full move plan, then execute it.
/// The plan is never re-validated against the live filesystem once built.
use crate::error::{SortError, SortResult};
use crate::file_category::{
    CategoryRuleSet, Classification, IgnorePatterns, LEGACY_NESTED_FOLDER, OVERFLOW_FOLDER,
    extension_of,
};
use crate::progress::{ChannelObserver, ProgressEvent, ProgressObserver};
use std::collections::{BTreeMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

/// Snapshot of one entry of the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Name as stored on disk; destinations are built from it.
    pub file_name: OsString,
    /// Lossy UTF-8 form of the name, used for matching.
    pub name: String,
    /// Absolute path at scan time.
    pub path: PathBuf,
    /// True for directories.
    pub is_dir: bool,
    /// Lowercase extension for files.
    pub extension: Option<String>,
}

/// One planned move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Category folder the entry goes to.
    pub folder: String,
    pub is_dir: bool,
}

/// Every move of a pass, keyed by source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovePlan {
    moves: BTreeMap<PathBuf, PlannedMove>,
}

impl MovePlan {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Planned destination for a source path.
    pub fn destination_of(&self, source: &Path) -> Option<&Path> {
        self.moves.get(source).map(|m| m.destination.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedMove> {
        self.moves.values()
    }

    fn insert(&mut self, planned: PlannedMove) {
        self.moves.insert(planned.source.clone(), planned);
    }
}

/// Options for a sort pass.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Move subdirectories into the overflow folder.
    pub sort_directories: bool,
    /// Plan only; create nothing and move nothing.
    pub dry_run: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            sort_directories: true,
            dry_run: false,
        }
    }
}

/// Outcome of one attempted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Renamed,
    /// Rename failed; the entry was copied and the source removed.
    Copied,
    Failed(String),
}

/// Summary of a finished pass.
#[derive(Debug, Clone, Default)]
pub struct SortReport {
    /// Every planned move, in execution order.
    pub planned: Vec<PlannedMove>,
    /// Number of entries that reached their destination.
    pub moved: usize,
    /// Source path and reason for each failed move.
    pub failed: Vec<(PathBuf, String)>,
    pub dry_run: bool,
}

impl SortReport {
    /// Planned moves per category folder.
    pub fn counts_by_folder(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for planned in &self.planned {
            *counts.entry(planned.folder.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Sorts one target directory according to a rule set.
#[derive(Debug, Clone)]
pub struct SortEngine {
    target: PathBuf,
    rules: CategoryRuleSet,
    ignore: IgnorePatterns,
    reserved: HashSet<String>,
    options: SortOptions,
}

impl SortEngine {
    /// Creates an engine for `target`. Rules and ignore patterns are held
    /// read-only for the engine's lifetime.
    pub fn new(
        target: impl Into<PathBuf>,
        rules: CategoryRuleSet,
        ignore: IgnorePatterns,
        options: SortOptions,
    ) -> Self {
        let reserved = rules.reserved_names();
        Self {
            target: target.into(),
            rules,
            ignore,
            reserved,
            options,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn options(&self) -> SortOptions {
        self.options
    }

    /// Runs a full pass: scan, ensure folders, plan, execute.
    ///
    /// # Errors
    ///
    /// Fails only if the target is unusable or a category folder cannot be
    /// created. Per-entry move failures are reported in the returned
    /// [`SortReport`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dlsort::file_category::{CategoryRule, CategoryRuleSet, IgnorePatterns};
    /// use dlsort::file_organizer::{SortEngine, SortOptions};
    /// use dlsort::progress::NullObserver;
    ///
    /// let rules = CategoryRuleSet::new(vec![CategoryRule::new("Docs", ["pdf"])]);
    /// let engine = SortEngine::new(
    ///     "/home/user/Downloads",
    ///     rules,
    ///     IgnorePatterns::default(),
    ///     SortOptions::default(),
    /// );
    /// let report = engine.run(&mut NullObserver).expect("sort failed");
    /// println!("moved {} entries", report.moved);
    /// ```
    pub fn run(&self, observer: &mut dyn ProgressObserver) -> SortResult<SortReport> {
        self.validate_target()?;
        let entries = self.scan()?;
        if !self.options.dry_run {
            self.ensure_category_folders()?;
        }
        let plan = self.build_plan(&entries);
        if self.options.dry_run {
            return Ok(SortReport {
                planned: plan.iter().cloned().collect(),
                moved: 0,
                failed: Vec::new(),
                dry_run: true,
            });
        }
        Ok(self.execute(&plan, observer))
    }

    fn validate_target(&self) -> SortResult<()> {
        let metadata = fs::metadata(&self.target).map_err(|e| SortError::InvalidTarget {
            path: self.target.clone(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(SortError::InvalidTarget {
                path: self.target.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "target is not a directory",
                ),
            });
        }
        Ok(())
    }

    /// Lists the direct children of the target directory.
    ///
    /// Directories are included only when directory sorting is enabled.
    /// Entries are returned sorted by name.
    pub fn scan(&self) -> SortResult<Vec<DirectoryEntry>> {
        let read_dir = fs::read_dir(&self.target).map_err(|e| SortError::ScanFailed {
            path: self.target.clone(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy().to_string();
            if name == "." || name == ".." {
                continue;
            }
            let is_dir = file_type.is_dir();
            if is_dir && !self.options.sort_directories {
                continue;
            }
            if !is_dir && !file_type.is_file() {
                continue;
            }
            entries.push(DirectoryEntry {
                extension: if is_dir { None } else { extension_of(&name) },
                path: entry.path(),
                file_name,
                name,
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    /// Decides where an entry goes, if anywhere.
    pub fn classify(&self, entry: &DirectoryEntry) -> Classification {
        if self.reserved.contains(&entry.name) {
            return Classification::Reserved;
        }
        if self.ignore.is_ignored(&entry.name) {
            return Classification::Ignored;
        }
        if entry.is_dir {
            if !self.options.sort_directories {
                return Classification::DirectoryDisabled;
            }
            return Classification::Move {
                folder: OVERFLOW_FOLDER.to_string(),
            };
        }
        entry
            .extension
            .as_deref()
            .and_then(|ext| self.rules.folder_for_extension(ext))
            .map(|folder| Classification::Move {
                folder: folder.to_string(),
            })
            .unwrap_or(Classification::Unrecognized)
    }

    /// Creates every rule folder, the overflow folder and the built-in
    /// reserved folders under the target directory.
    ///
    /// A rule folder that an older release nested under `Download Folders`
    /// is moved back to the target root.
    pub fn ensure_category_folders(&self) -> SortResult<()> {
        let mut names: Vec<&str> = self.reserved.iter().map(String::as_str).collect();
        names.sort_unstable();

        for folder in self.rules.folders() {
            let root = self.target.join(folder);
            let nested = self.target.join(LEGACY_NESTED_FOLDER).join(folder);
            if !root.exists() && nested.is_dir() {
                match fs::rename(&nested, &root) {
                    Ok(()) => tracing::info!(folder, "recovered nested category folder"),
                    Err(e) => tracing::warn!(folder, error = %e, "could not recover nested category folder"),
                }
            }
        }

        for name in names {
            let path = self.target.join(name);
            if path.is_dir() {
                continue;
            }
            if path.exists() {
                // Moves into this folder fail one by one in execute.
                tracing::warn!(path = %path.display(), "category folder name is taken by a file");
                continue;
            }
            fs::create_dir_all(&path).map_err(|e| SortError::DirectoryCreationFailed {
                path: path.clone(),
                source: e,
            })?;
            tracing::debug!(path = %path.display(), "created category folder");
        }
        Ok(())
    }

    /// Computes a free destination for `entry` inside `folder`.
    ///
    /// Files get ` (N)` before their extension, directories after their full
    /// name. Every candidate is probed against the filesystem and against
    /// `claimed`, the destinations already taken by this plan.
    pub fn resolve_destination(
        &self,
        entry: &DirectoryEntry,
        folder: &str,
        claimed: &HashSet<PathBuf>,
    ) -> PathBuf {
        let dir = self.target.join(folder);
        let taken = |candidate: &Path| candidate.exists() || claimed.contains(candidate);

        let first = dir.join(&entry.file_name);
        if !taken(&first) {
            return first;
        }

        let mut counter = 1u32;
        loop {
            let candidate = dir.join(suffixed_name(&entry.file_name, counter, entry.is_dir));
            tracing::debug!(candidate = %candidate.display(), "duplicate found, trying next name");
            if !taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Builds the full move plan from a scan snapshot.
    pub fn build_plan(&self, entries: &[DirectoryEntry]) -> MovePlan {
        let mut plan = MovePlan::default();
        let mut claimed = HashSet::new();

        for entry in entries {
            let classification = self.classify(entry);
            tracing::debug!(name = %entry.name, ?classification, "classified entry");
            let Classification::Move { folder } = classification else {
                continue;
            };
            let destination = self.resolve_destination(entry, &folder, &claimed);
            claimed.insert(destination.clone());
            plan.insert(PlannedMove {
                source: entry.path.clone(),
                destination,
                folder,
                is_dir: entry.is_dir,
            });
        }
        plan
    }

    /// Executes every move of the plan, reporting progress.
    ///
    /// Each move is independent; failures are recorded and the pass goes on.
    pub fn execute(&self, plan: &MovePlan, observer: &mut dyn ProgressObserver) -> SortReport {
        let mut report = SortReport {
            planned: plan.iter().cloned().collect(),
            ..SortReport::default()
        };

        if plan.is_empty() {
            observer.on_event(ProgressEvent::Status("Nothing to move.".to_string()));
            observer.on_event(ProgressEvent::Range { min: 0, max: 1 });
            observer.on_event(ProgressEvent::Value(1));
            return report;
        }

        let total = plan.len();
        observer.on_event(ProgressEvent::Status(format!("Moving {} files...", total)));
        observer.on_event(ProgressEvent::Range { min: 0, max: total });
        observer.on_event(ProgressEvent::Value(0));

        for (done, planned) in plan.iter().enumerate() {
            match move_entry(&planned.source, &planned.destination) {
                MoveOutcome::Failed(reason) => {
                    tracing::warn!(
                        source = %planned.source.display(),
                        destination = %planned.destination.display(),
                        %reason,
                        "move failed"
                    );
                    report.failed.push((planned.source.clone(), reason));
                }
                outcome => {
                    tracing::debug!(
                        source = %planned.source.display(),
                        destination = %planned.destination.display(),
                        ?outcome,
                        "moved"
                    );
                    report.moved += 1;
                }
            }
            observer.on_event(ProgressEvent::Value(done + 1));
        }

        observer.on_event(ProgressEvent::Status("Done.".to_string()));
        report
    }
}

/// Runs a pass on a worker thread.
///
/// Progress events arrive on the returned receiver; the channel closes when
/// the pass ends. Join the handle for the report.
pub fn spawn_sort(
    engine: SortEngine,
) -> (Receiver<ProgressEvent>, JoinHandle<SortResult<SortReport>>) {
    let (mut observer, receiver) = ChannelObserver::new();
    let handle = thread::spawn(move || engine.run(&mut observer));
    (receiver, handle)
}

/// Inserts ` (N)` before the last extension of a file name, or after the
/// whole name for directories and extension-less files.
fn suffixed_name(name: &OsStr, counter: u32, is_dir: bool) -> OsString {
    let path = Path::new(name);
    let mut candidate = OsString::new();
    match (is_dir, path.file_stem(), path.extension()) {
        (false, Some(stem), Some(extension)) => {
            candidate.push(stem);
            candidate.push(format!(" ({})", counter));
            candidate.push(".");
            candidate.push(extension);
        }
        _ => {
            candidate.push(name);
            candidate.push(format!(" ({})", counter));
        }
    }
    candidate
}

/// Moves one entry, falling back to copy-then-delete when rename fails.
pub fn move_entry(source: &Path, destination: &Path) -> MoveOutcome {
    let rename_error = match fs::rename(source, destination) {
        Ok(()) => return MoveOutcome::Renamed,
        Err(e) => e,
    };
    if !source.exists() {
        return MoveOutcome::Failed(rename_error.to_string());
    }
    tracing::debug!(source = %source.display(), error = %rename_error, "rename failed, copying");

    match copy_then_remove(source, destination) {
        MoveOutcome::Failed(reason) => {
            MoveOutcome::Failed(format!("rename failed ({}); {}", rename_error, reason))
        }
        outcome => outcome,
    }
}

/// Copies `source` to `destination` (recursively for directories), then
/// removes the source. A failed copy leaves no partial destination behind.
pub fn copy_then_remove(source: &Path, destination: &Path) -> MoveOutcome {
    let copied = if source.is_dir() {
        copy_dir_recursive(source, destination)
    } else {
        fs::copy(source, destination).map(|_| ())
    };
    if let Err(e) = copied {
        // Leave no partial copy behind.
        let _ = if destination.is_dir() {
            fs::remove_dir_all(destination)
        } else {
            fs::remove_file(destination)
        };
        return MoveOutcome::Failed(format!("copy failed ({})", e));
    }

    let removed = if source.is_dir() {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    };
    match removed {
        Ok(()) => MoveOutcome::Copied,
        Err(e) => MoveOutcome::Failed(format!("copied but could not remove source: {}", e)),
    }
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::CategoryRule;
    use crate::progress::RecordingObserver;
    use tempfile::TempDir;

    fn engine(base: &Path, options: SortOptions) -> SortEngine {
        let rules = CategoryRuleSet::new(vec![
            CategoryRule::new("Docs", ["pdf", "txt"]),
            CategoryRule::new("Pics", ["png"]),
        ]);
        SortEngine::new(base, rules, IgnorePatterns::compile([r"\.part$"]), options)
    }

    fn file_entry(base: &Path, name: &str) -> DirectoryEntry {
        DirectoryEntry {
            file_name: OsString::from(name),
            name: name.to_string(),
            path: base.join(name),
            is_dir: false,
            extension: extension_of(name),
        }
    }

    #[test]
    fn test_resolve_destination_without_collision() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let engine = engine(temp_dir.path(), SortOptions::default());
        let entry = file_entry(temp_dir.path(), "a.txt");

        let destination = engine.resolve_destination(&entry, "Docs", &HashSet::new());
        assert_eq!(destination, temp_dir.path().join("Docs").join("a.txt"));
    }

    #[test]
    fn test_resolve_destination_increments_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let docs = base.join("Docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("a.txt"), "1").unwrap();
        fs::write(docs.join("a (1).txt"), "2").unwrap();

        let engine = engine(base, SortOptions::default());
        let destination =
            engine.resolve_destination(&file_entry(base, "a.txt"), "Docs", &HashSet::new());
        assert_eq!(destination, docs.join("a (2).txt"));
    }

    #[test]
    fn test_resolve_destination_respects_claimed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let engine = engine(base, SortOptions::default());
        let claimed: HashSet<PathBuf> = [base.join("Docs").join("a.txt")].into_iter().collect();

        let destination = engine.resolve_destination(&file_entry(base, "a.txt"), "Docs", &claimed);
        assert_eq!(destination, base.join("Docs").join("a (1).txt"));
    }

    #[test]
    fn test_directory_suffix_goes_after_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join(OVERFLOW_FOLDER).join("old.v2")).unwrap();

        let engine = engine(base, SortOptions::default());
        let entry = DirectoryEntry {
            file_name: OsString::from("old.v2"),
            name: "old.v2".to_string(),
            path: base.join("old.v2"),
            is_dir: true,
            extension: None,
        };
        let destination = engine.resolve_destination(&entry, OVERFLOW_FOLDER, &HashSet::new());
        assert_eq!(destination, base.join(OVERFLOW_FOLDER).join("old.v2 (1)"));
    }

    #[test]
    fn test_suffixed_name() {
        let suffixed = |name: &str, is_dir| suffixed_name(OsStr::new(name), 1, is_dir);
        assert_eq!(suffixed("a.txt", false), "a (1).txt");
        assert_eq!(suffixed("a.tar.gz", false), "a.tar (1).gz");
        assert_eq!(suffixed("noext", false), "noext (1)");
        assert_eq!(suffixed(".hidden", false), ".hidden (1)");
        assert_eq!(suffixed("dir.name", true), "dir.name (1)");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_kept_byte_for_byte() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let raw = OsStr::from_bytes(b"caf\xe9.pdf");
        fs::create_dir(base.join("Docs")).unwrap();
        fs::write(base.join("Docs").join(raw), "older").unwrap();
        fs::write(base.join(raw), "newer").unwrap();

        let report = engine(base, SortOptions::default())
            .run(&mut RecordingObserver::default())
            .unwrap();

        assert_eq!(report.moved, 1);
        let renamed = base.join("Docs").join(OsStr::from_bytes(b"caf\xe9 (1).pdf"));
        assert_eq!(fs::read_to_string(renamed).unwrap(), "newer");
        assert_eq!(fs::read_to_string(base.join("Docs").join(raw)).unwrap(), "older");
        assert!(!base.join(raw).exists());
    }

    #[test]
    fn test_file_named_like_reserved_folder_does_not_abort() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("Tixati"), "not a folder").unwrap();
        fs::write(base.join("report.pdf"), "pdf").unwrap();

        let report = engine(base, SortOptions::default())
            .run(&mut RecordingObserver::default())
            .unwrap();

        assert_eq!(report.moved, 1);
        assert!(base.join("Tixati").is_file());
        assert!(base.join("Docs").join("report.pdf").exists());
    }

    #[test]
    fn test_file_named_like_rule_folder_fails_per_item() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("Docs"), "not a folder").unwrap();
        fs::write(base.join("report.pdf"), "pdf").unwrap();
        fs::write(base.join("photo.png"), "png").unwrap();

        let report = engine(base, SortOptions::default())
            .run(&mut RecordingObserver::default())
            .unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, base.join("report.pdf"));
        assert!(base.join("report.pdf").exists());
        assert!(base.join("Pics").join("photo.png").exists());
        assert_eq!(fs::read_to_string(base.join("Docs")).unwrap(), "not a folder");
    }

    #[test]
    fn test_classify_reserved_ignored_unrecognized() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let engine = engine(base, SortOptions::default());

        let reserved = DirectoryEntry {
            file_name: OsString::from("Docs"),
            name: "Docs".to_string(),
            path: base.join("Docs"),
            is_dir: true,
            extension: None,
        };
        assert_eq!(engine.classify(&reserved), Classification::Reserved);
        assert_eq!(
            engine.classify(&file_entry(base, "movie.pdf.part")),
            Classification::Ignored
        );
        assert_eq!(
            engine.classify(&file_entry(base, "disk.iso")),
            Classification::Unrecognized
        );
        assert_eq!(
            engine.classify(&file_entry(base, "SCAN.PDF")),
            Classification::Move {
                folder: "Docs".to_string()
            }
        );
    }

    #[test]
    fn test_classify_directory_disabled() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let engine = engine(
            base,
            SortOptions {
                sort_directories: false,
                dry_run: false,
            },
        );
        let dir = DirectoryEntry {
            file_name: OsString::from("old"),
            name: "old".to_string(),
            path: base.join("old"),
            is_dir: true,
            extension: None,
        };
        assert_eq!(engine.classify(&dir), Classification::DirectoryDisabled);
    }

    #[test]
    fn test_ensure_category_folders_recovers_nested() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let nested = base.join(LEGACY_NESTED_FOLDER).join("Docs");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("kept.pdf"), "x").unwrap();

        engine(base, SortOptions::default())
            .ensure_category_folders()
            .unwrap();

        assert!(base.join("Docs").join("kept.pdf").exists());
        assert!(!nested.exists());
        assert!(base.join("Pics").is_dir());
        assert!(base.join(OVERFLOW_FOLDER).is_dir());
    }

    #[test]
    fn test_execute_empty_plan_reports_trivial_range() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let engine = engine(temp_dir.path(), SortOptions::default());
        let mut observer = RecordingObserver::default();

        let report = engine.execute(&MovePlan::default(), &mut observer);
        assert_eq!(report.moved, 0);
        assert_eq!(
            observer.events,
            vec![
                ProgressEvent::Status("Nothing to move.".to_string()),
                ProgressEvent::Range { min: 0, max: 1 },
                ProgressEvent::Value(1),
            ]
        );
    }

    #[test]
    fn test_execute_continues_after_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("Docs")).unwrap();
        fs::write(base.join("b.txt"), "b").unwrap();

        let mut plan = MovePlan::default();
        plan.insert(PlannedMove {
            source: base.join("a.txt"),
            destination: base.join("Docs").join("a.txt"),
            folder: "Docs".to_string(),
            is_dir: false,
        });
        plan.insert(PlannedMove {
            source: base.join("b.txt"),
            destination: base.join("Docs").join("b.txt"),
            folder: "Docs".to_string(),
            is_dir: false,
        });

        let mut observer = RecordingObserver::default();
        let report = engine(base, SortOptions::default()).execute(&plan, &mut observer);

        assert_eq!(report.moved, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, base.join("a.txt"));
        assert!(base.join("Docs").join("b.txt").exists());
        assert_eq!(
            observer.events,
            vec![
                ProgressEvent::Status("Moving 2 files...".to_string()),
                ProgressEvent::Range { min: 0, max: 2 },
                ProgressEvent::Value(0),
                ProgressEvent::Value(1),
                ProgressEvent::Value(2),
                ProgressEvent::Status("Done.".to_string()),
            ]
        );
    }

    #[test]
    fn test_move_entry_missing_source_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let outcome = move_entry(
            &temp_dir.path().join("missing.txt"),
            &temp_dir.path().join("dest.txt"),
        );
        assert!(matches!(outcome, MoveOutcome::Failed(_)));
    }

    #[test]
    fn test_copy_then_remove_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir(base.join("Docs")).unwrap();
        fs::write(base.join("a.txt"), "data").unwrap();

        let outcome = copy_then_remove(&base.join("a.txt"), &base.join("Docs").join("a.txt"));

        assert_eq!(outcome, MoveOutcome::Copied);
        assert!(!base.join("a.txt").exists());
        assert_eq!(fs::read_to_string(base.join("Docs").join("a.txt")).unwrap(), "data");
    }

    #[test]
    fn test_copy_then_remove_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join("old").join("inner")).unwrap();
        fs::write(base.join("old").join("inner").join("f.txt"), "data").unwrap();
        fs::create_dir(base.join(OVERFLOW_FOLDER)).unwrap();
        let destination = base.join(OVERFLOW_FOLDER).join("old");

        let outcome = copy_then_remove(&base.join("old"), &destination);

        assert_eq!(outcome, MoveOutcome::Copied);
        assert!(!base.join("old").exists());
        assert_eq!(
            fs::read_to_string(destination.join("inner").join("f.txt")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_copy_then_remove_failure_keeps_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("a.txt"), "data").unwrap();

        let outcome = copy_then_remove(&base.join("a.txt"), &base.join("missing").join("a.txt"));

        assert!(matches!(outcome, MoveOutcome::Failed(_)));
        assert_eq!(fs::read_to_string(base.join("a.txt")).unwrap(), "data");
        assert!(!base.join("missing").exists());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::create_dir_all(base.join("src").join("inner")).unwrap();
        fs::write(base.join("src").join("inner").join("f.txt"), "data").unwrap();

        copy_dir_recursive(&base.join("src"), &base.join("dst")).unwrap();
        assert_eq!(
            fs::read_to_string(base.join("dst").join("inner").join("f.txt")).unwrap(),
            "data"
        );
    }
}
