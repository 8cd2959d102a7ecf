use super::line_ending::LineEnding;

/// One per-file operation declared in a patch.
///
/// Paths are kept exactly as declared; resolution against the workspace
/// happens later in [`crate::safety::WorkspaceGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOperation {
    /// `*** Add File: <path>` followed by `+` lines
    Add { path: String, content: String },
    /// `*** Update File: <path>` followed by `@@` hunks
    Update { path: String, hunks: Vec<PatchHunk> },
    /// `*** Delete File: <path>`
    Delete { path: String },
}

impl PatchOperation {
    /// Path exactly as it appeared in the declaration line.
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Update { path, .. }
            | PatchOperation::Delete { path } => path,
        }
    }

    /// Whether the operation needs the current content of its target.
    pub fn reads_target(&self) -> bool {
        matches!(
            self,
            PatchOperation::Update { .. } | PatchOperation::Delete { .. }
        )
    }

    pub fn verb(&self) -> &'static str {
        match self {
            PatchOperation::Add { .. } => "add",
            PatchOperation::Update { .. } => "update",
            PatchOperation::Delete { .. } => "delete",
        }
    }
}

/// An anchored run of edits inside an Update operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchHunk {
    /// Line of existing content the edits start from (never empty)
    pub context: String,
    pub changes: Vec<PatchChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchChange {
    Keep(String),
    Remove(String),
    Add(String),
}

/// Result of parsing patch text.
///
/// The same value feeds both the pre-execution preview and the engine, so the
/// two can never disagree about what the patch contains.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPatch {
    pub operations: Vec<PatchOperation>,
    /// Line ending used by the patch text itself; Add content is joined with it.
    pub line_ending: LineEnding,
}

impl ParsedPatch {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
