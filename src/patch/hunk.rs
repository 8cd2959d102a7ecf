//! Context-anchored hunk application.
//!
//! Each hunk is located by the first line whose trimmed text equals the
//! trimmed context line, then its changes are replayed from that index:
//! Keep advances, Remove deletes in place, Add inserts and advances. Hunks
//! run in order against the progressively mutated line list.

use super::line_ending::{split_lines, LineEnding};
use super::types::{PatchChange, PatchHunk};
use crate::error::PatchError;
use std::path::Path;
use tracing::warn;

/// Minimum similarity for a line to be offered as a "closest line" hint.
const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Apply `hunks` to `content` and reassemble with `line_ending`.
pub fn apply_hunks_to_content(
    path: &Path,
    content: &str,
    line_ending: LineEnding,
    hunks: &[PatchHunk],
) -> Result<String, PatchError> {
    let lines = apply_hunks(path, split_lines(content), hunks)?;
    Ok(line_ending.join(&lines))
}

pub fn apply_hunks(
    path: &Path,
    mut lines: Vec<String>,
    hunks: &[PatchHunk],
) -> Result<Vec<String>, PatchError> {
    for hunk in hunks {
        let anchor = find_context(&lines, &hunk.context).ok_or_else(|| {
            PatchError::ContextNotFound {
                path: path.to_path_buf(),
                context: hunk.context.clone(),
                suggestion: closest_line(&lines, &hunk.context),
            }
        })?;
        apply_changes(path, &mut lines, anchor, hunk)?;
    }
    Ok(lines)
}

/// First index whose trimmed text equals the trimmed context.
pub fn find_context(lines: &[String], context: &str) -> Option<usize> {
    let needle = context.trim();
    lines.iter().position(|line| line.trim() == needle)
}

fn apply_changes(
    path: &Path,
    lines: &mut Vec<String>,
    anchor: usize,
    hunk: &PatchHunk,
) -> Result<(), PatchError> {
    let mut cursor = anchor;

    for change in &hunk.changes {
        match change {
            PatchChange::Keep(_) => cursor += 1,
            PatchChange::Remove(expected) => {
                if cursor >= lines.len() {
                    return Err(PatchError::HunkOverrun {
                        path: path.to_path_buf(),
                        context: hunk.context.clone(),
                    });
                }
                let removed = lines.remove(cursor);
                if removed.trim() != expected.trim() {
                    warn!(
                        path = %path.display(),
                        expected = %expected,
                        removed = %removed,
                        "removed line differs from the declared text"
                    );
                }
            }
            PatchChange::Add(line) => {
                let at = cursor.min(lines.len());
                lines.insert(at, line.clone());
                cursor = at + 1;
            }
        }
    }

    Ok(())
}

fn closest_line(lines: &[String], context: &str) -> Option<String> {
    let needle = context.trim();
    lines
        .iter()
        .map(|line| (strsim::normalized_levenshtein(line.trim(), needle), line))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, line)| line.trim().to_string())
}
