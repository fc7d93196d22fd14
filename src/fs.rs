//! Filesystem collaborator.
//!
//! Every filesystem touch made by the watcher and the document index goes
//! through the [`Filesystem`] trait. Operations are synchronous and report
//! failure explicitly; nothing here retries or waits.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use walkdir::WalkDir;

use crate::utils::is_hidden_name;

/// Errors from filesystem operations.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Path already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FsError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            FsError::Io {
                op,
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// Filesystem provider consumed by the core.
pub trait Filesystem: Send + Sync {
    /// List the direct children of `dir`, skipping dotfiles and dot-directories.
    fn list(&self, dir: &Path) -> FsResult<Vec<EntryInfo>>;

    /// Metadata for a single path.
    fn stat(&self, path: &Path) -> FsResult<EntryInfo>;

    /// Copy a file. Never overwrites an existing target.
    fn copy(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Move a file. Never overwrites an existing target.
    fn rename(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Delete a file (or a directory tree).
    fn remove(&self, path: &Path) -> FsResult<()>;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }

    fn entry_info(path: &Path, metadata: &std::fs::Metadata) -> EntryInfo {
        EntryInfo {
            path: path.to_path_buf(),
            is_dir: metadata.is_dir(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    fn refuse_existing(to: &Path) -> FsResult<()> {
        if to.exists() {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl Filesystem for LocalFilesystem {
    fn list(&self, dir: &Path) -> FsResult<Vec<EntryInfo>> {
        if !dir.is_dir() {
            return Err(FsError::NotFound {
                path: dir.to_path_buf(),
            });
        }

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_name(&e.file_name().to_string_lossy()));

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if vanished(dir, e.path(), e.io_error()) => continue,
                Err(e) => return Err(FsError::io("list", dir, io::Error::from(e))),
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if vanished(dir, Some(entry.path()), e.io_error()) => continue,
                Err(e) => return Err(FsError::io("stat", entry.path(), io::Error::from(e))),
            };
            entries.push(Self::entry_info(entry.path(), &metadata));
        }

        Ok(entries)
    }

    fn stat(&self, path: &Path) -> FsResult<EntryInfo> {
        let metadata = std::fs::metadata(path).map_err(|e| FsError::io("stat", path, e))?;
        Ok(Self::entry_info(path, &metadata))
    }

    fn copy(&self, from: &Path, to: &Path) -> FsResult<()> {
        Self::refuse_existing(to)?;
        std::fs::copy(from, to).map_err(|e| FsError::io("copy", from, e))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        if from == to {
            return Ok(());
        }
        if !from.exists() {
            return Err(FsError::NotFound {
                path: from.to_path_buf(),
            });
        }
        Self::refuse_existing(to)?;
        std::fs::rename(from, to).map_err(|e| FsError::io("rename", from, e))
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        let metadata = std::fs::metadata(path).map_err(|e| FsError::io("stat", path, e))?;
        if metadata.is_dir() {
            std::fs::remove_dir_all(path).map_err(|e| FsError::io("remove", path, e))
        } else {
            std::fs::remove_file(path).map_err(|e| FsError::io("remove", path, e))
        }
    }
}

/// An entry deleted between readdir and stat is not a listing failure.
fn vanished(dir: &Path, path: Option<&Path>, source: Option<&io::Error>) -> bool {
    let Some(path) = path.filter(|path| *path != dir) else {
        return false;
    };
    if source.map(io::Error::kind) != Some(io::ErrorKind::NotFound) {
        return false;
    }
    crate::debug_event!("fs", "entry vanished while listing", "{}", path.display());
    true
}
