// src/fs/mod.rs

//! Filesystem access used by the builder and finalizer.
//!
//! Processors read and write their own files; everything the engine itself
//! touches (scanning sources, copying/merging final outputs, cleaning the
//! target dir) goes through [`FileSystem`] so tests can swap in
//! [`mock::MockFileSystem`].

use std::collections::HashSet;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub mod hash;
pub mod mock;
pub mod path_utils;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Write `contents`, creating parent directories. Implementations may
    /// leave the file untouched when it already holds exactly these bytes.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Modification time in milliseconds since the Unix epoch.
    fn mtime_ms(&self, path: &Path) -> Result<u128>;

    /// Copy one file, creating the target's parent directories.
    fn copy_file(&self, source: &Path, target: &Path) -> Result<()>;

    /// Write the bytes of every source, each followed by a newline, into `dest`.
    fn concat_files(&self, dest: &Path, sources: &[PathBuf]) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Create a directory symlink `link` pointing at `original`.
    fn symlink_dir(&self, original: &Path, link: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    /// Write only when the file is missing or its bytes differ, so unchanged
    /// outputs keep their mtime.
    fn write_if_changed(&self, path: &Path, contents: &[u8]) -> Result<bool> {
        if path.is_file() {
            let existing = hash::compute_file_hash(path)?;
            if existing == hash::content_hash(contents) {
                debug!(?path, "content unchanged; not rewriting");
                return Ok(false);
            }
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::write(path, contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(true)
    }
}

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_if_changed(path, contents).map(|_| ())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn mtime_ms(&self, path: &Path) -> Result<u128> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("reading mtime of {:?}", path))?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0))
    }

    fn copy_file(&self, source: &Path, target: &Path) -> Result<()> {
        let contents = self.read(source)?;
        self.write_if_changed(target, &contents)?;
        Ok(())
    }

    fn concat_files(&self, dest: &Path, sources: &[PathBuf]) -> Result<()> {
        let mut buf = Vec::new();
        for source in sources {
            buf.extend_from_slice(&self.read(source)?);
            buf.push(b'\n');
        }
        self.write_if_changed(dest, &buf)?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("removing dir {:?}", path))
    }

    fn symlink_dir(&self, original: &Path, link: &Path) -> Result<()> {
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(original, link)
            .with_context(|| format!("linking {:?} -> {:?}", link, original))?;
        #[cfg(windows)]
        std::os::windows::fs::symlink_dir(original, link)
            .with_context(|| format!("linking {:?} -> {:?}", link, original))?;
        Ok(())
    }
}

/// List every file below `dir` as a forward-slash path relative to `dir`,
/// sorted for a stable scan order.
pub fn list_all_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    if !fs.is_dir(dir) {
        return Ok(files);
    }
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        for path in fs.read_dir(&current)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(dir) {
                    files.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Delete everything under `dir` that is neither in `keep` nor an ancestor
/// directory of something in `keep`.
///
/// Failures are logged and skipped; the number of failed deletions is
/// returned.
pub fn clean_directory(fs: &dyn FileSystem, dir: &Path, keep: &HashSet<PathBuf>) -> usize {
    let mut failures = 0;
    let files = match list_all_files(fs, dir) {
        Ok(files) => files,
        Err(err) => {
            warn!(?dir, error = %err, "failed to list directory for cleanup");
            return 1;
        }
    };

    for rel in files {
        let path = dir.join(&rel);
        if keep.contains(&path) {
            continue;
        }
        debug!(?path, "removing stale target");
        if let Err(err) = fs.remove_file(&path) {
            warn!(?path, error = %err, "failed to remove stale target");
            failures += 1;
        }
    }

    // Then drop directories that no longer lead to a kept file.
    let mut dirs = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        if let Ok(entries) = fs.read_dir(&current) {
            for path in entries.into_iter().filter(|p| fs.is_dir(p)) {
                stack.push(path.clone());
                dirs.push(path);
            }
        }
    }
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for d in dirs {
        if keep.iter().any(|k| k.starts_with(&d)) {
            continue;
        }
        if let Err(err) = fs.remove_dir_all(&d) {
            warn!(path = ?d, error = %err, "failed to remove stale directory");
            failures += 1;
        }
    }

    failures
}
