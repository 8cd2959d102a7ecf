//! Parser for the multi-file patch format.
//!
//! ```text
//! *** Add File: <path>
//! +<line>
//! *** Update File: <path>
//! @@ <context line> @@
//!  <kept line>
//! -<removed line>
//! +<added line>
//! *** Delete File: <path>
//! ```
//!
//! Lines outside a declaration block are ignored, so `*** Begin Patch` /
//! `*** End Patch` envelopes pass through untouched.

use super::errors::ParseError;
use super::line_ending::LineEnding;
use super::types::{ParsedPatch, PatchChange, PatchHunk, PatchOperation};
use tracing::debug;

const ADD_FILE: &str = "*** Add File:";
const UPDATE_FILE: &str = "*** Update File:";
const DELETE_FILE: &str = "*** Delete File:";
const HUNK_MARKER: &str = "@@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationKind {
    Add,
    Update,
    Delete,
}

/// Parse raw patch text into an ordered list of operations.
pub fn parse_patch(text: &str) -> Result<ParsedPatch, ParseError> {
    let line_ending = LineEnding::detect_or(text, LineEnding::Lf);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut operations = Vec::new();
    let mut idx = 0usize;

    while idx < lines.len() {
        let Some((kind, path)) = parse_declaration(lines[idx], idx + 1)? else {
            idx += 1;
            continue;
        };

        let body_start = idx + 1;
        let body_end = lines[body_start..]
            .iter()
            .position(|line| declaration_kind(line).is_some())
            .map_or(lines.len(), |offset| body_start + offset);
        let body = &lines[body_start..body_end];

        let operation = match kind {
            DeclarationKind::Add => PatchOperation::Add {
                path,
                content: parse_add_body(body, line_ending),
            },
            DeclarationKind::Update => {
                let hunks = parse_hunks(&path, body, body_start + 1)?;
                PatchOperation::Update { path, hunks }
            }
            DeclarationKind::Delete => PatchOperation::Delete { path },
        };
        operations.push(operation);
        idx = body_end;
    }

    debug!(
        operations = operations.len(),
        line_ending = %line_ending,
        "parsed patch"
    );

    Ok(ParsedPatch {
        operations,
        line_ending,
    })
}

fn declaration_kind(line: &str) -> Option<(DeclarationKind, &str)> {
    if let Some(rest) = line.strip_prefix(ADD_FILE) {
        Some((DeclarationKind::Add, rest))
    } else if let Some(rest) = line.strip_prefix(UPDATE_FILE) {
        Some((DeclarationKind::Update, rest))
    } else {
        line.strip_prefix(DELETE_FILE)
            .map(|rest| (DeclarationKind::Delete, rest))
    }
}

fn parse_declaration(
    line: &str,
    line_number: usize,
) -> Result<Option<(DeclarationKind, String)>, ParseError> {
    let Some((kind, rest)) = declaration_kind(line) else {
        return Ok(None);
    };

    let path = rest.trim();
    if path.is_empty() {
        return Err(ParseError::MissingPath {
            line_number,
            line: line.to_string(),
        });
    }

    Ok(Some((kind, path.to_string())))
}

/// Collect `+` lines; the joined content carries no trailing terminator.
fn parse_add_body(body: &[&str], line_ending: LineEnding) -> String {
    let lines: Vec<&str> = body
        .iter()
        .filter_map(|line| line.strip_prefix('+'))
        .collect();
    line_ending.join(&lines)
}

fn parse_hunks(
    path: &str,
    body: &[&str],
    first_line_number: usize,
) -> Result<Vec<PatchHunk>, ParseError> {
    let mut hunks = Vec::new();
    let mut current: Option<PatchHunk> = None;

    for (offset, line) in body.iter().enumerate() {
        if let Some(header) = line.strip_prefix(HUNK_MARKER) {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }

            let header = header.trim();
            let context = header.strip_suffix(HUNK_MARKER).unwrap_or(header).trim();
            if context.is_empty() {
                return Err(ParseError::EmptyContextLine {
                    path: path.to_string(),
                    line_number: first_line_number + offset,
                });
            }

            current = Some(PatchHunk {
                context: context.to_string(),
                changes: Vec::new(),
            });
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            continue;
        };

        match parse_change(line) {
            Some(change) => hunk.changes.push(change),
            // Anything else closes the hunk
            None => hunks.extend(current.take()),
        }
    }

    hunks.extend(current);
    Ok(hunks)
}

fn parse_change(line: &str) -> Option<PatchChange> {
    if let Some(rest) = line.strip_prefix(' ') {
        Some(PatchChange::Keep(rest.to_string()))
    } else if let Some(rest) = line.strip_prefix('-') {
        Some(PatchChange::Remove(rest.to_string()))
    } else {
        line.strip_prefix('+')
            .map(|rest| PatchChange::Add(rest.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_file() {
        let parsed = parse_patch("*** Add File: test.txt\n+Line 1\n+Line 2\n+Line 3").unwrap();
        assert_eq!(
            parsed.operations,
            vec![PatchOperation::Add {
                path: "test.txt".to_string(),
                content: "Line 1\nLine 2\nLine 3".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_add_file_trims_block_terminator() {
        let parsed = parse_patch("*** Add File: a.txt\n+one\n+two\n").unwrap();
        assert_eq!(
            parsed.operations[0],
            PatchOperation::Add {
                path: "a.txt".to_string(),
                content: "one\ntwo".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_add_file_with_crlf_patch() {
        let parsed = parse_patch("*** Add File: a.txt\r\n+one\r\n+two\r\n").unwrap();
        assert_eq!(parsed.line_ending, LineEnding::CrLf);
        assert_eq!(
            parsed.operations[0],
            PatchOperation::Add {
                path: "a.txt".to_string(),
                content: "one\r\ntwo".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_update_with_hunks() {
        let patch = "\
*** Update File: src/lib.rs
@@ fn main() {
 fn main() {
-    old();
+    new();
@@ fn other() @@
+// inserted
 fn other() {";

        let parsed = parse_patch(patch).unwrap();
        let PatchOperation::Update { path, hunks } = &parsed.operations[0] else {
            panic!("expected update");
        };
        assert_eq!(path, "src/lib.rs");
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].context, "fn main() {");
        assert_eq!(
            hunks[0].changes,
            vec![
                PatchChange::Keep("fn main() {".to_string()),
                PatchChange::Remove("    old();".to_string()),
                PatchChange::Add("    new();".to_string()),
            ]
        );
        assert_eq!(hunks[1].context, "fn other()");
        assert_eq!(hunks[1].changes.len(), 2);
    }

    #[test]
    fn test_parse_unprefixed_line_closes_hunk() {
        let patch = "\
*** Update File: a.txt
@@ anchor @@
-gone

+ignored";

        let parsed = parse_patch(patch).unwrap();
        let PatchOperation::Update { hunks, .. } = &parsed.operations[0] else {
            panic!("expected update");
        };
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].changes, vec![PatchChange::Remove("gone".to_string())]);
    }

    #[test]
    fn test_parse_multiple_operations_in_order() {
        let patch = "\
*** Begin Patch
*** Add File: new.txt
+hello
*** Update File: existing.txt
@@ anchor @@
-a
+b
*** Delete File: to-delete.txt
*** End Patch";

        let parsed = parse_patch(patch).unwrap();
        let verbs: Vec<_> = parsed.operations.iter().map(|op| op.verb()).collect();
        assert_eq!(verbs, vec!["add", "update", "delete"]);
        assert_eq!(parsed.operations[2].path(), "to-delete.txt");
    }

    #[test]
    fn test_parse_missing_path_fails() {
        let err = parse_patch("*** Add File:   \n+x").unwrap_err();
        assert!(matches!(err, ParseError::MissingPath { line_number: 1, .. }));
    }

    #[test]
    fn test_parse_empty_context_fails() {
        let err = parse_patch("*** Update File: a.txt\n@@  @@\n-x").unwrap_err();
        assert_eq!(
            err,
            ParseError::EmptyContextLine {
                path: "a.txt".to_string(),
                line_number: 2,
            }
        );
    }

    #[test]
    fn test_parse_without_declarations_is_empty() {
        let parsed = parse_patch("just some chatter\nfrom the model").unwrap();
        assert!(parsed.is_empty());
    }
}
