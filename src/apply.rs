//! Two-phase application of a [`Commit`] to the filesystem.
//!
//! [`CommitApplier::stage`] does all the work that can fail without touching
//! existing files: parent directories are created, new content is written to
//! temp files beside each target and fsync'd, and every target is checked
//! against the state it was loaded in. [`StagedCommit::commit`] then renames
//! the temp files into place in commit order and only afterwards performs
//! deletes. If any of that fails, entries already applied are restored from
//! the old content held in memory.

use crate::commit::{ChangeKind, Commit};
use crate::error::PatchError;
use crate::loader::{current_fingerprint, ensure_absent};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const TEMP_PREFIX: &str = ".agent-patcher-";

#[derive(Debug, Clone, Copy, Default)]
pub struct CommitApplier;

impl CommitApplier {
    /// Prepare every write without replacing any existing file.
    pub fn stage(commit: &Commit) -> Result<StagedCommit, PatchError> {
        let mut staged = StagedCommit {
            writes: Vec::new(),
            deletes: Vec::new(),
            created_dirs: Vec::new(),
            committed: false,
        };

        for (path, change) in commit.iter() {
            match change.kind {
                ChangeKind::Add => {
                    ensure_absent(path)?;
                    staged.create_parent_dirs(path)?;
                    let temp = write_temp(path, change.new_text(), None)?;
                    staged.writes.push(StagedWrite {
                        path: path.clone(),
                        temp,
                        previous: None,
                    });
                }
                ChangeKind::Update => {
                    verify_unchanged(path, change.fingerprint)?;
                    staged.create_parent_dirs(path)?;
                    let permissions = fs::metadata(path).ok().map(|m| m.permissions());
                    let temp = write_temp(path, change.new_text(), permissions)?;
                    staged.writes.push(StagedWrite {
                        path: path.clone(),
                        temp,
                        previous: change.old_content.clone(),
                    });
                }
                ChangeKind::Delete => {
                    verify_unchanged(path, change.fingerprint)?;
                    staged.deletes.push(StagedDelete {
                        path: path.clone(),
                        previous: change.old_text().to_string(),
                    });
                }
            }
        }

        debug!(
            writes = staged.writes.len(),
            deletes = staged.deletes.len(),
            "staged commit"
        );
        Ok(staged)
    }

    /// Stage and commit in one step.
    pub fn apply(commit: &Commit) -> Result<(), PatchError> {
        Self::stage(commit)?.commit()
    }
}

#[derive(Debug)]
struct StagedWrite {
    path: PathBuf,
    temp: NamedTempFile,
    /// `None` for files the commit creates
    previous: Option<String>,
}

#[derive(Debug)]
struct StagedDelete {
    path: PathBuf,
    previous: String,
}

/// What a partially committed entry needs to be undone.
enum Applied {
    Wrote { path: PathBuf, previous: Option<String> },
    Deleted { path: PathBuf, previous: String },
}

/// A commit whose new content sits in temp files next to its targets.
///
/// Dropping it without calling [`StagedCommit::commit`] removes the temp
/// files and any directories staging created.
#[derive(Debug)]
#[must_use = "a staged commit does nothing until commit() is called"]
pub struct StagedCommit {
    writes: Vec<StagedWrite>,
    deletes: Vec<StagedDelete>,
    /// Deepest directories first
    created_dirs: Vec<PathBuf>,
    committed: bool,
}

impl StagedCommit {
    /// Move staged content into place, then delete.
    pub fn commit(mut self) -> Result<(), PatchError> {
        let writes = std::mem::take(&mut self.writes);
        let deletes = std::mem::take(&mut self.deletes);
        let mut applied = Vec::with_capacity(writes.len() + deletes.len());

        for write in writes {
            let StagedWrite {
                path,
                temp,
                previous,
            } = write;
            if let Err(err) = temp.persist(&path) {
                let error = PatchError::io("rename into", &path, err.error);
                return Err(rollback(applied, error));
            }
            debug!(path = %path.display(), "wrote file");
            applied.push(Applied::Wrote { path, previous });
        }

        for delete in deletes {
            if let Err(err) = fs::remove_file(&delete.path) {
                let error = PatchError::io("delete", &delete.path, err);
                return Err(rollback(applied, error));
            }
            debug!(path = %delete.path.display(), "deleted file");
            applied.push(Applied::Deleted {
                path: delete.path,
                previous: delete.previous,
            });
        }

        self.committed = true;
        Ok(())
    }

    /// Create missing ancestors of `path`, remembering which ones were new.
    fn create_parent_dirs(&mut self, path: &Path) -> Result<(), PatchError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };

        let missing: Vec<PathBuf> = parent
            .ancestors()
            .take_while(|dir| !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(parent)
            .map_err(|err| PatchError::io("create directories", parent, err))?;
        self.created_dirs.extend(missing);
        Ok(())
    }
}

impl Drop for StagedCommit {
    fn drop(&mut self) {
        // Temp files go first so the directories below can be emptied
        self.writes.clear();
        if self.committed {
            return;
        }
        for dir in &self.created_dirs {
            let _ = fs::remove_dir(dir);
        }
    }
}

fn rollback(applied: Vec<Applied>, cause: PatchError) -> PatchError {
    warn!(entries = applied.len(), error = %cause, "commit failed, restoring applied files");

    for entry in applied.into_iter().rev() {
        let (path, result) = match entry {
            Applied::Wrote {
                path,
                previous: None,
            } => {
                let result = fs::remove_file(&path);
                (path, result)
            }
            Applied::Wrote {
                path,
                previous: Some(previous),
            }
            | Applied::Deleted { path, previous } => {
                let result = fs::write(&path, previous);
                (path, result)
            }
        };

        if let Err(source) = result {
            return PatchError::RollbackFailed {
                path,
                cause: cause.to_string(),
                source,
            };
        }
    }

    info!("rollback complete");
    cause
}

fn verify_unchanged(path: &Path, expected: Option<u64>) -> Result<(), PatchError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match current_fingerprint(path)? {
        Some(actual) if actual == expected => Ok(()),
        _ => Err(PatchError::StaleContent {
            path: path.to_path_buf(),
        }),
    }
}

/// Write `content` to a temp file in the target's directory and fsync it.
fn write_temp(
    path: &Path,
    content: &str,
    permissions: Option<fs::Permissions>,
) -> Result<NamedTempFile, PatchError> {
    let parent = path.parent().ok_or_else(|| {
        PatchError::io(
            "stage",
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory"),
        )
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)
        .map_err(|err| PatchError::io("create temp file in", parent, err))?;

    temp.write_all(content.as_bytes())
        .map_err(|err| PatchError::io("write temp file for", path, err))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| PatchError::io("sync temp file for", path, err))?;

    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions)
            .map_err(|err| PatchError::io("copy permissions to", temp.path(), err))?;
    }

    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::FileChange;
    use crate::loader::FileLoader;
    use crate::patch::LineEnding;

    fn workspace() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, root)
    }

    fn update(path: &Path, new_content: &str) -> FileChange {
        let loaded = FileLoader::default().load(path).unwrap();
        FileChange::update("x", &loaded, new_content.to_string(), LineEnding::Lf)
    }

    #[test]
    fn test_apply_add_creates_parent_dirs() {
        let (_dir, root) = workspace();
        let target = root.join("a/b/new.txt");

        let mut commit = Commit::new();
        commit.insert(
            target.clone(),
            FileChange::add("a/b/new.txt", "hello".to_string(), LineEnding::Lf),
        );

        CommitApplier::apply(&commit).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_dropping_staged_commit_leaves_no_trace() {
        let (_dir, root) = workspace();
        let target = root.join("deep/nested/new.txt");

        let mut commit = Commit::new();
        commit.insert(
            target.clone(),
            FileChange::add("deep/nested/new.txt", "hello".to_string(), LineEnding::Lf),
        );

        let staged = CommitApplier::stage(&commit).unwrap();
        assert!(root.join("deep/nested").is_dir());
        drop(staged);

        assert!(!target.exists());
        assert!(!root.join("deep").exists());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_stage_detects_external_modification() {
        let (_dir, root) = workspace();
        let target = root.join("file.txt");
        fs::write(&target, "original").unwrap();

        let mut commit = Commit::new();
        commit.insert(target.clone(), update(&target, "patched"));

        fs::write(&target, "someone else wrote this").unwrap();

        let err = CommitApplier::stage(&commit).unwrap_err();
        assert!(matches!(err, PatchError::StaleContent { .. }));
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "someone else wrote this"
        );
    }

    #[test]
    fn test_deletes_run_after_writes() {
        let (_dir, root) = workspace();
        let keep = root.join("keep.txt");
        let gone = root.join("gone.txt");
        fs::write(&keep, "one").unwrap();
        fs::write(&gone, "bye").unwrap();

        let loaded_gone = FileLoader::default().load(&gone).unwrap();
        let mut commit = Commit::new();
        commit.insert(gone.clone(), FileChange::delete("gone.txt", Some(&loaded_gone)));
        commit.insert(keep.clone(), update(&keep, "two"));

        CommitApplier::apply(&commit).unwrap();
        assert!(!gone.exists());
        assert_eq!(fs::read_to_string(&keep).unwrap(), "two");
    }

    #[test]
    fn test_failed_commit_restores_earlier_writes() {
        let (_dir, root) = workspace();
        let first = root.join("first.txt");
        let second = root.join("second.txt");
        fs::write(&first, "first original").unwrap();
        fs::write(&second, "second original").unwrap();

        let mut commit = Commit::new();
        commit.insert(first.clone(), update(&first, "first patched"));
        commit.insert(second.clone(), update(&second, "second patched"));

        let staged = CommitApplier::stage(&commit).unwrap();

        // A directory where the second file was makes its rename fail
        fs::remove_file(&second).unwrap();
        fs::create_dir(&second).unwrap();
        fs::write(second.join("blocker"), "x").unwrap();

        let err = staged.commit().unwrap_err();
        assert!(matches!(err, PatchError::Io { .. }));
        assert_eq!(fs::read_to_string(&first).unwrap(), "first original");
    }
}
