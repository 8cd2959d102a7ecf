//! Advisory per-path locks shared by concurrent patch invocations.
//!
//! A lock is an in-process marker, not an OS lock: it only excludes other
//! invocations that go through the same [`LockManager`].

use crate::error::PatchError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

static GLOBAL: Lazy<Arc<LockManager>> = Lazy::new(|| Arc::new(LockManager::new()));

#[derive(Debug, Default)]
pub struct LockManager {
    locked: Mutex<HashSet<PathBuf>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide manager used when an engine is not given its own.
    pub fn global() -> Arc<LockManager> {
        Arc::clone(&GLOBAL)
    }

    /// Lock every path or none of them.
    ///
    /// Availability of all paths is checked before any is taken, so a
    /// conflict never leaves a partial acquisition behind. Duplicate entries
    /// in `paths` are collapsed.
    pub fn try_acquire_all<I, P>(self: &Arc<Self>, paths: I) -> Result<PathLockGuard, PatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut wanted: Vec<PathBuf> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !wanted.iter().any(|p| p == path) {
                wanted.push(path.to_path_buf());
            }
        }

        let mut locked = self.locked.lock();
        if let Some(busy) = wanted.iter().find(|path| locked.contains(*path)) {
            debug!(path = %busy.display(), "lock conflict");
            return Err(PatchError::LockConflict { path: busy.clone() });
        }
        locked.extend(wanted.iter().cloned());
        drop(locked);

        debug!(count = wanted.len(), "acquired path locks");
        Ok(PathLockGuard {
            manager: Arc::clone(self),
            paths: wanted,
        })
    }

    pub fn is_locked(&self, path: &Path) -> bool {
        self.locked.lock().contains(path)
    }

    pub fn locked_count(&self) -> usize {
        self.locked.lock().len()
    }

    fn release(&self, paths: &[PathBuf]) {
        let mut locked = self.locked.lock();
        for path in paths {
            locked.remove(path);
        }
    }
}

/// Holds a set of path locks; releases them on drop.
#[derive(Debug)]
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct PathLockGuard {
    manager: Arc<LockManager>,
    paths: Vec<PathBuf>,
}

impl PathLockGuard {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        self.manager.release(&self.paths);
        debug!(count = self.paths.len(), "released path locks");
    }
}
