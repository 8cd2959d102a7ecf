use crate::patch::ParseError;
use crate::safety::SafetyError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing, validating or applying a patch.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch text is empty")]
    EmptyPatch,

    #[error("Missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    #[error("Invalid parameter '{name}': expected {expected}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
    },

    #[error("Invalid patch: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("Patch touches '{path}' more than once")]
    DuplicatePath { path: PathBuf },

    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    #[error("File already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("File too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("File is not valid UTF-8 text: {path}")]
    NotUtf8 { path: PathBuf },

    #[error("Context line not found: `{context}` in {path}{}", suggestion_suffix(.suggestion))]
    ContextNotFound {
        path: PathBuf,
        context: String,
        suggestion: Option<String>,
    },

    #[error("Hunk anchored at `{context}` removes past the end of {path}")]
    HunkOverrun { path: PathBuf, context: String },

    #[error("File is locked by another patch in progress: {path}")]
    LockConflict { path: PathBuf },

    #[error("File changed on disk since it was read: {path}")]
    StaleContent { path: PathBuf },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rollback failed after apply error ({cause}); {path} may be inconsistent: {source}")]
    RollbackFailed {
        path: PathBuf,
        cause: String,
        #[source]
        source: std::io::Error,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(line) => format!(" (closest line: `{line}`)"),
        None => String::new(),
    }
}

impl PatchError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PatchError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Category of the failure, stable across message wording changes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatchError::EmptyPatch
            | PatchError::MissingParameter { .. }
            | PatchError::InvalidParameter { .. }
            | PatchError::Parse(_)
            | PatchError::DuplicatePath { .. }
            | PatchError::NotUtf8 { .. } => ErrorKind::Validation,
            PatchError::Safety(SafetyError::EmptyPath) => ErrorKind::Validation,
            PatchError::Safety(_) => ErrorKind::PathSecurity,
            PatchError::NotFound { .. } | PatchError::NotAFile { .. } => ErrorKind::NotFound,
            PatchError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            PatchError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            PatchError::ContextNotFound { .. } | PatchError::HunkOverrun { .. } => {
                ErrorKind::ContextNotFound
            }
            PatchError::LockConflict { .. } => ErrorKind::LockConflict,
            PatchError::StaleContent { .. } => ErrorKind::StaleContent,
            PatchError::Io { .. } | PatchError::RollbackFailed { .. } => ErrorKind::Io,
        }
    }
}

/// Tagged failure category exposed at the invocation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    PathSecurity,
    NotFound,
    AlreadyExists,
    FileTooLarge,
    ContextNotFound,
    LockConflict,
    StaleContent,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::PathSecurity => "path_security",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::ContextNotFound => "context_not_found",
            ErrorKind::LockConflict => "lock_conflict",
            ErrorKind::StaleContent => "stale_content",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_not_found_message() {
        let err = PatchError::ContextNotFound {
            path: PathBuf::from("a.txt"),
            context: "fn main()".to_string(),
            suggestion: Some("fn  main()".to_string()),
        };
        let message = err.to_string();
        assert!(message.starts_with("Context line not found: `fn main()`"));
        assert!(message.contains("closest line: `fn  main()`"));
        assert_eq!(err.kind(), ErrorKind::ContextNotFound);
    }

    #[test]
    fn test_safety_errors_map_to_path_security() {
        let err = PatchError::from(SafetyError::PathTraversal {
            path: "../etc/passwd".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::PathSecurity);
        assert_eq!(PatchError::from(SafetyError::EmptyPath).kind(), ErrorKind::Validation);
    }
}
