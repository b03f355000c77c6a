// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::hash::compute_file_hash;

/// Last observed mtime and content digest of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    modified: SystemTime,
    hash: String,
}

/// Fingerprints of source files seen by the watcher.
///
/// A single save usually produces several notify events for one file. Only
/// the first of them carries a new fingerprint; the rest are dropped before
/// they reach the edit queues. A touch moves the mtime and counts as a change.
#[derive(Debug, Default)]
pub struct ContentCache {
    fingerprints: HashMap<PathBuf, Fingerprint>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint `path` and report whether its mtime or content differs
    /// from what was cached. An uncached file counts as changed.
    pub fn refresh(&mut self, path: &Path) -> Result<bool> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("reading mtime of {:?}", path))?;
        let current = Fingerprint {
            modified,
            hash: compute_file_hash(path)?,
        };
        let changed = self.fingerprints.get(path) != Some(&current);
        if !changed {
            debug!(?path, "mtime and content unchanged");
        }
        self.fingerprints.insert(path.to_path_buf(), current);
        Ok(changed)
    }

    pub fn forget(&mut self, path: &Path) {
        self.fingerprints.remove(path);
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
