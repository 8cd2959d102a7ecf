//! Agent Patcher: multi-file patch engine for coding assistants
//!
//! Applies patches in the envelope format emitted by language-model agents
//! (`*** Add File:`, `*** Update File:`, `*** Delete File:` blocks with
//! context-anchored `@@` hunks) to a workspace directory.
//!
//! # Architecture
//!
//! Patch text is parsed once into [`ParsedPatch`]. The [`PatchEngine`] then
//! resolves every declared path through the [`WorkspaceGuard`], locks the
//! resolved paths with the [`LockManager`], loads current content, and builds
//! an in-memory [`Commit`] holding old and new content for each file. Only
//! after all of that succeeds is the commit staged to temp files and renamed
//! into place.
//!
//! # Safety
//!
//! - Paths containing `..` or `~`, and paths resolving outside the workspace,
//!   are rejected before any I/O
//! - Concurrent patches touching the same file fail fast instead of waiting
//! - Writes go through tempfile + fsync + rename
//! - A failed commit restores the files it already changed
//!
//! # Example
//!
//! ```no_run
//! use agent_patcher::PatchEngine;
//!
//! let engine = PatchEngine::new("/path/to/workspace")?;
//! let outcome = engine.apply(
//!     "*** Begin Patch\n*** Add File: hello.txt\n+Hello\n*** End Patch",
//!     false,
//! )?;
//! println!("{}", outcome.formatted_output());
//! # Ok::<(), agent_patcher::PatchError>(())
//! ```

pub mod apply;
pub mod commit;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod lock;
pub mod patch;
pub mod safety;
pub mod stats;
pub mod summary;

// Re-exports
pub use apply::{CommitApplier, StagedCommit};
pub use commit::{ChangeKind, Commit, CommitBuilder, FileChange};
pub use config::{ConfigError, DuplicatePathPolicy, EngineConfig, LineEndingPolicy, StatisticsMode};
pub use engine::{PatchEngine, PatchOutcome, PatchRequest, ToolResult};
pub use error::{ErrorKind, PatchError};
pub use loader::{FileLoader, LoadedFile};
pub use lock::{LockManager, PathLockGuard};
pub use patch::{
    parse_patch, LineEnding, ParseError, ParsedPatch, PatchChange, PatchHunk, PatchOperation,
};
pub use safety::{SafetyError, WorkspaceGuard};
pub use stats::{LineStatistics, MyersStatistics, PatchStatistics, PositionalStatistics};
pub use summary::{display_summary, format_outcome, PatchPreview};
