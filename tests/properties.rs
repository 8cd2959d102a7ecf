//! Property tests for the patch engine

use agent_patcher::{LockManager, PatchEngine};
use proptest::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn engine_for(dir: &TempDir) -> PatchEngine {
    PatchEngine::new(dir.path())
        .unwrap()
        .with_lock_manager(Arc::new(LockManager::new()))
}

/// Printable lines without terminators
fn line() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _;(){}=.]{0,24}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn add_writes_exactly_the_declared_lines(lines in prop::collection::vec(line(), 1..12)) {
        let dir = TempDir::new().unwrap();
        let engine = engine_for(&dir);

        let body: String = lines.iter().map(|l| format!("+{l}\n")).collect();
        let patch = format!("*** Add File: out.txt\n{body}");
        let outcome = engine.apply(&patch, false).unwrap();

        let written = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        prop_assert_eq!(written, lines.join("\n"));
        prop_assert_eq!(outcome.statistics.additions, lines.len());
        prop_assert_eq!(outcome.statistics.removals, 0);
    }

    #[test]
    fn dry_run_never_touches_disk(
        lines in prop::collection::vec(line(), 1..12),
        anchor in 0usize..12,
        replacement in line(),
    ) {
        let dir = TempDir::new().unwrap();
        let engine = engine_for(&dir);
        let original = lines.join("\n");
        fs::write(dir.path().join("file.txt"), &original).unwrap();

        let anchor_line = &lines[anchor % lines.len()];
        let patch = format!(
            "*** Update File: file.txt\n@@ {ctx} @@\n-{ctx}\n+{replacement}\n*** Add File: extra.txt\n+x",
            ctx = anchor_line,
        );

        // Blank anchors are rejected by the parser; either way nothing changes
        let _ = engine.apply(&patch, true);

        prop_assert_eq!(fs::read_to_string(dir.path().join("file.txt")).unwrap(), original);
        prop_assert!(!dir.path().join("extra.txt").exists());
    }

    #[test]
    fn keep_only_hunks_change_nothing(
        lines in prop::collection::vec("[a-z]{1,12}", 1..12),
        anchor in 0usize..12,
    ) {
        let dir = TempDir::new().unwrap();
        let engine = engine_for(&dir);
        let original = lines.join("\n");
        fs::write(dir.path().join("file.txt"), &original).unwrap();

        let anchor_line = &lines[anchor % lines.len()];
        let patch = format!("*** Update File: file.txt\n@@ {anchor_line}\n {anchor_line}\n");
        let outcome = engine.apply(&patch, false).unwrap();

        prop_assert_eq!(outcome.statistics.additions, 0);
        prop_assert_eq!(outcome.statistics.removals, 0);
        prop_assert_eq!(fs::read_to_string(dir.path().join("file.txt")).unwrap(), original);
    }
}
