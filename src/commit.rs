//! In-memory change set built from parsed operations and loaded content.
//!
//! Everything a patch will do is resolved here before the filesystem is
//! touched: hunks are applied to the loaded text and each target ends up
//! with its old and new content side by side.

use crate::config::{DuplicatePathPolicy, EngineConfig};
use crate::error::PatchError;
use crate::loader::LoadedFile;
use crate::patch::{apply_hunks_to_content, LineEnding, PatchOperation};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

/// Resolved change for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    /// Path as written in the patch
    pub declared_path: String,
    /// Content before the patch (Update/Delete)
    pub old_content: Option<String>,
    /// Content after the patch (Add/Update)
    pub new_content: Option<String>,
    pub line_ending: LineEnding,
    /// Fingerprint of the bytes `old_content` was read from
    pub fingerprint: Option<u64>,
}

impl FileChange {
    pub fn add(declared_path: impl Into<String>, content: String, line_ending: LineEnding) -> Self {
        Self {
            kind: ChangeKind::Add,
            declared_path: declared_path.into(),
            old_content: None,
            new_content: Some(content),
            line_ending,
            fingerprint: None,
        }
    }

    pub fn update(
        declared_path: impl Into<String>,
        loaded: &LoadedFile,
        new_content: String,
        line_ending: LineEnding,
    ) -> Self {
        Self {
            kind: ChangeKind::Update,
            declared_path: declared_path.into(),
            old_content: Some(loaded.content.clone()),
            new_content: Some(new_content),
            line_ending,
            fingerprint: Some(loaded.fingerprint),
        }
    }

    pub fn delete(declared_path: impl Into<String>, loaded: Option<&LoadedFile>) -> Self {
        Self {
            kind: ChangeKind::Delete,
            declared_path: declared_path.into(),
            old_content: Some(
                loaded
                    .map(|file| file.content.clone())
                    .unwrap_or_default(),
            ),
            new_content: None,
            line_ending: LineEnding::default(),
            fingerprint: loaded.map(|file| file.fingerprint),
        }
    }

    pub fn old_text(&self) -> &str {
        self.old_content.as_deref().unwrap_or("")
    }

    pub fn new_text(&self) -> &str {
        self.new_content.as_deref().unwrap_or("")
    }
}

/// Ordered map from resolved absolute path to its change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    changes: IndexMap<PathBuf, FileChange>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry moves to the end.
    pub fn insert(&mut self, path: PathBuf, change: FileChange) -> Option<FileChange> {
        let previous = self.changes.shift_remove(&path);
        self.changes.insert(path, change);
        previous
    }

    pub fn get(&self, path: &Path) -> Option<&FileChange> {
        self.changes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileChange)> {
        self.changes.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.changes.keys()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// An operation paired with the absolute path it resolved to.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedOperation<'a> {
    pub path: &'a Path,
    pub operation: &'a PatchOperation,
}

pub struct CommitBuilder<'a> {
    config: &'a EngineConfig,
    patch_line_ending: LineEnding,
}

impl<'a> CommitBuilder<'a> {
    pub fn new(config: &'a EngineConfig, patch_line_ending: LineEnding) -> Self {
        Self {
            config,
            patch_line_ending,
        }
    }

    /// Enforce the duplicate-path policy.
    ///
    /// Returns one warning per overwritten entry under `last-write-wins`.
    pub fn check_duplicates(
        &self,
        operations: &[ResolvedOperation<'_>],
    ) -> Result<Vec<String>, PatchError> {
        let mut seen: HashMap<&Path, &PatchOperation> = HashMap::new();
        let mut warnings = Vec::new();

        for resolved in operations {
            let Some(earlier) = seen.insert(resolved.path, resolved.operation) else {
                continue;
            };

            match self.config.duplicate_paths {
                DuplicatePathPolicy::Reject => {
                    return Err(PatchError::DuplicatePath {
                        path: resolved.path.to_path_buf(),
                    });
                }
                DuplicatePathPolicy::LastWriteWins => {
                    let message = format!(
                        "'{}' appears more than once; the later {} replaces the earlier {}",
                        resolved.operation.path(),
                        resolved.operation.verb(),
                        earlier.verb()
                    );
                    warn!(path = %resolved.path.display(), "{message}");
                    warnings.push(message);
                }
            }
        }

        Ok(warnings)
    }

    /// Merge operations with the content loaded for them.
    pub fn build(
        &self,
        operations: &[ResolvedOperation<'_>],
        loaded: &HashMap<PathBuf, LoadedFile>,
    ) -> Result<Commit, PatchError> {
        let mut commit = Commit::new();

        for resolved in operations {
            let path = resolved.path;
            let change = match resolved.operation {
                PatchOperation::Add { path: declared, content } => {
                    FileChange::add(declared.clone(), content.clone(), self.patch_line_ending)
                }
                PatchOperation::Delete { path: declared } => {
                    FileChange::delete(declared.clone(), loaded.get(path))
                }
                PatchOperation::Update { path: declared, hunks } => {
                    let file = loaded.get(path).ok_or_else(|| PatchError::NotFound {
                        path: path.to_path_buf(),
                    })?;
                    let line_ending = self.config.line_ending_for(&file.content);
                    let new_content =
                        apply_hunks_to_content(path, &file.content, line_ending, hunks)?;
                    FileChange::update(declared.clone(), file, new_content, line_ending)
                }
            };
            commit.insert(path.to_path_buf(), change);
        }

        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{PatchChange, PatchHunk};

    fn loaded(path: &str, content: &str) -> (PathBuf, LoadedFile) {
        let path = PathBuf::from(path);
        (
            path.clone(),
            LoadedFile {
                path,
                content: content.to_string(),
                fingerprint: 7,
            },
        )
    }

    #[test]
    fn test_build_all_kinds() {
        let config = EngineConfig::default();
        let builder = CommitBuilder::new(&config, LineEnding::Lf);

        let add = PatchOperation::Add {
            path: "new.txt".to_string(),
            content: "hi".to_string(),
        };
        let update = PatchOperation::Update {
            path: "old.txt".to_string(),
            hunks: vec![PatchHunk {
                context: "a".to_string(),
                changes: vec![
                    PatchChange::Remove("a".to_string()),
                    PatchChange::Add("b".to_string()),
                ],
            }],
        };
        let delete = PatchOperation::Delete {
            path: "gone.txt".to_string(),
        };

        let operations = [
            ResolvedOperation { path: Path::new("/w/new.txt"), operation: &add },
            ResolvedOperation { path: Path::new("/w/old.txt"), operation: &update },
            ResolvedOperation { path: Path::new("/w/gone.txt"), operation: &delete },
        ];
        let files: HashMap<_, _> = [loaded("/w/old.txt", "a\r\nz\r\n"), loaded("/w/gone.txt", "bye")]
            .into_iter()
            .collect();

        let commit = builder.build(&operations, &files).unwrap();
        assert_eq!(commit.len(), 3);

        let updated = commit.get(Path::new("/w/old.txt")).unwrap();
        assert_eq!(updated.kind, ChangeKind::Update);
        assert_eq!(updated.new_text(), "b\r\nz\r\n");
        assert_eq!(updated.line_ending, LineEnding::CrLf);
        assert_eq!(updated.fingerprint, Some(7));

        let deleted = commit.get(Path::new("/w/gone.txt")).unwrap();
        assert_eq!(deleted.old_text(), "bye");
        assert_eq!(deleted.new_content, None);

        let order: Vec<_> = commit.paths().cloned().collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/w/new.txt"),
                PathBuf::from("/w/old.txt"),
                PathBuf::from("/w/gone.txt")
            ]
        );
    }

    #[test]
    fn test_duplicates_rejected_by_default() {
        let config = EngineConfig::default();
        let builder = CommitBuilder::new(&config, LineEnding::Lf);
        let delete = PatchOperation::Delete { path: "a.txt".to_string() };
        let again = PatchOperation::Delete { path: "./a.txt".to_string() };
        let operations = [
            ResolvedOperation { path: Path::new("/w/a.txt"), operation: &delete },
            ResolvedOperation { path: Path::new("/w/a.txt"), operation: &again },
        ];

        let err = builder.check_duplicates(&operations).unwrap_err();
        assert!(matches!(err, PatchError::DuplicatePath { .. }));
    }

    #[test]
    fn test_duplicates_last_write_wins() {
        let config = EngineConfig {
            duplicate_paths: DuplicatePathPolicy::LastWriteWins,
            ..EngineConfig::default()
        };
        let builder = CommitBuilder::new(&config, LineEnding::Lf);
        let first = PatchOperation::Add {
            path: "a.txt".to_string(),
            content: "first".to_string(),
        };
        let second = PatchOperation::Add {
            path: "a.txt".to_string(),
            content: "second".to_string(),
        };
        let operations = [
            ResolvedOperation { path: Path::new("/w/a.txt"), operation: &first },
            ResolvedOperation { path: Path::new("/w/a.txt"), operation: &second },
        ];

        let warnings = builder.check_duplicates(&operations).unwrap();
        assert_eq!(warnings.len(), 1);

        let commit = builder.build(&operations, &HashMap::new()).unwrap();
        assert_eq!(commit.len(), 1);
        assert_eq!(
            commit.get(Path::new("/w/a.txt")).unwrap().new_text(),
            "second"
        );
    }
}
