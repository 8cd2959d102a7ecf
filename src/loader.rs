//! Existence, size and encoding checks for files a patch references.

use crate::error::PatchError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Current content of an Update/Delete target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub content: String,
    /// xxh3 of the bytes read, checked again right before commit
    pub fingerprint: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct FileLoader {
    max_file_size: u64,
}

impl FileLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Read a file that must exist, be a regular file, fit under the size
    /// limit and hold UTF-8 text.
    pub fn load(&self, path: &Path) -> Result<LoadedFile, PatchError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PatchError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(PatchError::io("inspect", path, err)),
        };

        if !metadata.is_file() {
            return Err(PatchError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        if metadata.len() > self.max_file_size {
            return Err(PatchError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        let bytes = fs::read(path).map_err(|err| PatchError::io("read", path, err))?;
        let fingerprint = xxh3_64(&bytes);
        let content = String::from_utf8(bytes).map_err(|_| PatchError::NotUtf8 {
            path: path.to_path_buf(),
        })?;

        Ok(LoadedFile {
            path: path.to_path_buf(),
            content,
            fingerprint,
        })
    }

    /// Confirm an Add target does not exist yet.
    pub fn ensure_absent(&self, path: &Path) -> Result<(), PatchError> {
        ensure_absent(path)
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_FILE_SIZE)
    }
}

pub(crate) fn ensure_absent(path: &Path) -> Result<(), PatchError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Err(PatchError::AlreadyExists {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(PatchError::io("inspect", path, err)),
    }
}

/// Fingerprint of the file currently on disk, `None` if it is gone.
pub(crate) fn current_fingerprint(path: &Path) -> Result<Option<u64>, PatchError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(xxh3_64(&bytes))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PatchError::io("read", path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello\n").unwrap();

        let loaded = FileLoader::default().load(&path).unwrap();
        assert_eq!(loaded.content, "hello\n");
        assert_eq!(loaded.fingerprint, xxh3_64(b"hello\n"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileLoader::default()
            .load(&dir.path().join("missing.txt"))
            .unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileLoader::default().load(dir.path()).unwrap_err();
        assert!(matches!(err, PatchError::NotAFile { .. }));
    }

    #[test]
    fn test_load_respects_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "0123456789").unwrap();

        let err = FileLoader::new(4).load(&path).unwrap_err();
        assert!(matches!(
            err,
            PatchError::FileTooLarge {
                size: 10,
                limit: 4,
                ..
            }
        ));
        assert!(FileLoader::new(10).load(&path).is_ok());
    }

    #[test]
    fn test_load_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = FileLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, PatchError::NotUtf8 { .. }));
    }

    #[test]
    fn test_ensure_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        assert!(ensure_absent(&path).is_ok());

        fs::write(&path, "x").unwrap();
        assert!(matches!(
            ensure_absent(&path),
            Err(PatchError::AlreadyExists { .. })
        ));
    }
}
