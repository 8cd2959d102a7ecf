//! Human-readable summaries: the pre-execution preview and the result line.

use crate::patch::{ParsedPatch, PatchChange, PatchOperation};
use crate::stats::{line_count, PatchStatistics};
use serde::Serialize;
use std::fmt;

/// Declared changes of a parsed patch, counted before anything runs.
///
/// Built from the same [`ParsedPatch`] the engine executes. Additions and
/// removals are the declared `+`/`-` lines, so for Update operations they can
/// differ from the positional statistics of the executed result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchPreview {
    pub added_files: Vec<String>,
    pub updated_files: Vec<String>,
    pub deleted_files: Vec<String>,
    pub additions: usize,
    pub removals: usize,
}

impl PatchPreview {
    pub fn from_parsed(parsed: &ParsedPatch) -> Self {
        let mut preview = Self::default();

        for operation in &parsed.operations {
            match operation {
                PatchOperation::Add { path, content } => {
                    preview.added_files.push(path.clone());
                    preview.additions += line_count(content);
                }
                PatchOperation::Update { path, hunks } => {
                    preview.updated_files.push(path.clone());
                    for change in hunks.iter().flat_map(|hunk| &hunk.changes) {
                        match change {
                            PatchChange::Add(_) => preview.additions += 1,
                            PatchChange::Remove(_) => preview.removals += 1,
                            PatchChange::Keep(_) => {}
                        }
                    }
                }
                PatchOperation::Delete { path } => preview.deleted_files.push(path.clone()),
            }
        }

        preview
    }

    pub fn file_count(&self) -> usize {
        self.added_files.len() + self.updated_files.len() + self.deleted_files.len()
    }
}

impl fmt::Display for PatchPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file_count() == 0 {
            return write!(f, "Patch: no file operations");
        }

        let mut parts = Vec::new();
        if !self.added_files.is_empty() {
            parts.push(format!("add {}", self.added_files.join(", ")));
        }
        if !self.updated_files.is_empty() {
            parts.push(format!("update {}", self.updated_files.join(", ")));
        }
        if !self.deleted_files.is_empty() {
            parts.push(format!("delete {}", self.deleted_files.join(", ")));
        }

        write!(
            f,
            "Patch: {} (+{} -{})",
            parts.join("; "),
            self.additions,
            self.removals
        )
    }
}

/// Short preview line for a parsed patch.
pub fn display_summary(parsed: &ParsedPatch) -> String {
    PatchPreview::from_parsed(parsed).to_string()
}

/// Result line reported to the caller after a run.
pub fn format_outcome(stats: &PatchStatistics, dry_run: bool) -> String {
    let (files, additions, removals) = (stats.file_count(), stats.additions, stats.removals);
    if dry_run {
        format!(
            "[DRY RUN] Patch validation successful. Would change {files} files, {additions} additions, {removals} removals"
        )
    } else {
        format!("{files} files changed, {additions} additions, {removals} removals")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::parse_patch;
    use std::path::PathBuf;

    #[test]
    fn test_preview_counts_declared_lines() {
        let parsed = parse_patch(
            "\
*** Add File: new.txt
+one
+two
*** Update File: existing.txt
@@ anchor @@
 anchor
-old
+new
+newer
*** Delete File: to-delete.txt",
        )
        .unwrap();

        let preview = PatchPreview::from_parsed(&parsed);
        assert_eq!(preview.file_count(), 3);
        assert_eq!(preview.additions, 4);
        assert_eq!(preview.removals, 1);
        assert_eq!(
            preview.to_string(),
            "Patch: add new.txt; update existing.txt; delete to-delete.txt (+4 -1)"
        );
    }

    #[test]
    fn test_preview_of_empty_patch() {
        let parsed = parse_patch("nothing here").unwrap();
        assert_eq!(display_summary(&parsed), "Patch: no file operations");
    }

    #[test]
    fn test_format_outcome() {
        let stats = PatchStatistics {
            changed_files: vec![PathBuf::from("/w/a"), PathBuf::from("/w/b"), PathBuf::from("/w/c")],
            additions: 5,
            removals: 2,
            files: Vec::new(),
        };
        assert_eq!(
            format_outcome(&stats, false),
            "3 files changed, 5 additions, 2 removals"
        );
        assert_eq!(
            format_outcome(&stats, true),
            "[DRY RUN] Patch validation successful. Would change 3 files, 5 additions, 2 removals"
        );
    }
}
