use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Workspace safety checks to prevent a patch from touching files outside the
/// workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical path to workspace root
    workspace_root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is empty")]
    EmptyPath,

    #[error("Path traversal is not allowed: {path}")]
    PathTraversal { path: String },

    #[error("Path contains control characters: {path:?}")]
    ControlCharacters { path: String },

    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is a symbolic link: {path}")]
    SymlinkTarget { path: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// The workspace root will be canonicalized to handle symlinks correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;
        Ok(Self { workspace_root })
    }

    /// Check a path as declared in a patch.
    ///
    /// Returns the absolute path the patch may touch. The path does not have
    /// to exist yet (Add targets never do). Its parent directory is
    /// canonicalized so a symlinked directory cannot redirect the write
    /// elsewhere; the final component is kept as declared and must not be a
    /// symlink itself.
    pub fn validate_path(&self, raw_path: &str) -> Result<PathBuf, SafetyError> {
        if raw_path.trim().is_empty() {
            return Err(SafetyError::EmptyPath);
        }

        // Coarse textual check, applied before any resolution
        if raw_path.contains("..") || raw_path.contains('~') {
            return Err(SafetyError::PathTraversal {
                path: raw_path.to_string(),
            });
        }

        if raw_path.chars().any(|c| matches!(c, '\0' | '\r' | '\n')) {
            return Err(SafetyError::ControlCharacters {
                path: raw_path.to_string(),
            });
        }

        let path = Path::new(raw_path);
        let absolute = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.workspace_root.join(path))
        };

        self.check_inside(&absolute)?;

        let resolved = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => resolve_existing_prefix(parent)?.join(name),
            _ => absolute.clone(),
        };
        self.check_inside(&resolved)?;

        if is_symlink(&resolved) {
            return Err(SafetyError::SymlinkTarget { path: resolved });
        }

        Ok(resolved)
    }

    fn check_inside(&self, path: &Path) -> Result<(), SafetyError> {
        if !path.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: path.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        }
        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

/// Drop `.` components. `..` never reaches here.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false)
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf, SafetyError> {
    let mut existing = path;
    let mut missing = Vec::new();

    while existing.symlink_metadata().is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
