//! Snapshot-checked, atomic file replacement.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{path} changed on disk since it was read")]
    Changed { path: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Content of a file as read before patching, plus its xxh3 hash.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
    content: String,
    hash: u64,
}

impl FileSnapshot {
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let path = path.into();
        let content = fs::read_to_string(&path).map_err(|source| WriteError::Io {
            path: path.clone(),
            source,
        })?;
        let hash = xxh3_64(content.as_bytes());
        Ok(Self {
            path,
            content,
            hash,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the file on disk still holds the snapshotted bytes.
    pub fn is_current(&self) -> Result<bool, WriteError> {
        let on_disk = fs::read(&self.path).map_err(|source| WriteError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(xxh3_64(&on_disk) == self.hash)
    }

    /// Replace the file with `content` if it has not changed since the
    /// snapshot was taken.
    pub fn replace(&self, content: &str) -> Result<(), WriteError> {
        if !self.is_current()? {
            return Err(WriteError::Changed {
                path: self.path.clone(),
            });
        }
        atomic_write(&self.path, content.as_bytes())
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WriteError> {
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Same directory, so the rename stays on one filesystem
    let parent = path.parent().ok_or_else(|| {
        io_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_error)?;
    temp.write_all(content).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;

    // Keep the original permissions
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(io_error)?;
    }

    temp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
