//! Added/removed line counts for a commit.
//!
//! The default [`PositionalStatistics`] compares old and new content index by
//! index. It is O(n) and deterministic but not minimal: inserting one line
//! near the top of a file counts every line after it as changed. Callers that
//! need exact counts can select [`MyersStatistics`] without touching the
//! parser or applier.

use crate::commit::{ChangeKind, Commit, FileChange};
use crate::config::StatisticsMode;
use crate::patch::split_lines;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::PathBuf;

/// Counts (additions, removals) between two versions of a file.
pub trait LineStatistics: Send + Sync {
    fn count(&self, old: &str, new: &str) -> (usize, usize);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalStatistics;

impl LineStatistics for PositionalStatistics {
    fn count(&self, old: &str, new: &str) -> (usize, usize) {
        let old_lines = counted_lines(old);
        let new_lines = counted_lines(new);
        let mut additions = 0;
        let mut removals = 0;

        for i in 0..old_lines.len().max(new_lines.len()) {
            match (old_lines.get(i), new_lines.get(i)) {
                (None, Some(_)) => additions += 1,
                (Some(_), None) => removals += 1,
                (Some(a), Some(b)) if a != b => {
                    additions += 1;
                    removals += 1;
                }
                _ => {}
            }
        }

        (additions, removals)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MyersStatistics;

impl LineStatistics for MyersStatistics {
    fn count(&self, old: &str, new: &str) -> (usize, usize) {
        let old_lines = counted_lines(old);
        let new_lines = counted_lines(new);
        let old_refs: Vec<&str> = old_lines.iter().map(String::as_str).collect();
        let new_refs: Vec<&str> = new_lines.iter().map(String::as_str).collect();

        let diff = TextDiff::from_slices(&old_refs, &new_refs);
        diff.iter_all_changes()
            .fold((0, 0), |(additions, removals), change| match change.tag() {
                ChangeTag::Insert => (additions + 1, removals),
                ChangeTag::Delete => (additions, removals + 1),
                ChangeTag::Equal => (additions, removals),
            })
    }
}

impl StatisticsMode {
    pub fn counter(self) -> Box<dyn LineStatistics> {
        match self {
            StatisticsMode::Positional => Box::new(PositionalStatistics),
            StatisticsMode::Myers => Box::new(MyersStatistics),
        }
    }
}

/// Lines as the statistics see them: a literal split, so a trailing
/// terminator yields a counted empty element and empty content is one line.
fn counted_lines(content: &str) -> Vec<String> {
    split_lines(content)
}

pub fn line_count(content: &str) -> usize {
    counted_lines(content).len()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatistics {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub additions: usize,
    pub removals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchStatistics {
    pub changed_files: Vec<PathBuf>,
    pub additions: usize,
    pub removals: usize,
    pub files: Vec<FileStatistics>,
}

impl PatchStatistics {
    pub fn file_count(&self) -> usize {
        self.changed_files.len()
    }
}

pub fn file_statistics(counter: &dyn LineStatistics, change: &FileChange) -> (usize, usize) {
    match change.kind {
        ChangeKind::Add => (line_count(change.new_text()), 0),
        ChangeKind::Delete => (0, line_count(change.old_text())),
        ChangeKind::Update => counter.count(change.old_text(), change.new_text()),
    }
}

/// Per-file and aggregate counts, in commit order.
pub fn compute(counter: &dyn LineStatistics, commit: &Commit) -> PatchStatistics {
    let mut stats = PatchStatistics::default();

    for (path, change) in commit.iter() {
        let (additions, removals) = file_statistics(counter, change);
        stats.changed_files.push(path.clone());
        stats.additions += additions;
        stats.removals += removals;
        stats.files.push(FileStatistics {
            path: path.clone(),
            kind: change.kind,
            additions,
            removals,
        });
    }

    stats
}
