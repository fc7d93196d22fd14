//! Point-in-time view of a repository directory used for change detection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::fs::{Filesystem, FsResult};

/// Absolute path → last-modified time of every depth-1, non-hidden entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySnapshot {
    entries: BTreeMap<PathBuf, SystemTime>,
}

impl RepositorySnapshot {
    /// Snapshot with no entries. Diffing against it reports everything as added.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn capture(fs: &dyn Filesystem, root: &Path) -> FsResult<Self> {
        let entries = fs
            .list(root)?
            .into_iter()
            .map(|entry| (entry.path, entry.modified))
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).copied()
    }

    /// Changes needed to go from `self` to `newer`.
    pub fn diff(&self, newer: &RepositorySnapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (path, mtime) in &newer.entries {
            match self.entries.get(path) {
                None => changes.added.push(path.clone()),
                Some(old) if old != mtime => changes.modified.push(path.clone()),
                Some(_) => {}
            }
        }

        changes.removed = self
            .entries
            .keys()
            .filter(|path| !newer.entries.contains_key(*path))
            .cloned()
            .collect();

        changes
    }
}

impl FromIterator<(PathBuf, SystemTime)> for RepositorySnapshot {
    fn from_iter<I: IntoIterator<Item = (PathBuf, SystemTime)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Paths that differ between two snapshots, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}
