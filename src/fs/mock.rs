// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct MockFile {
    pub content: Vec<u8>,
    pub mtime_ms: u128,
}

/// Counters for the operations the finalizer performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockOpCounts {
    pub copies: usize,
    pub concats: usize,
    pub removals: usize,
}

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<PathBuf, MockFile>,
    links: BTreeMap<PathBuf, PathBuf>,
    clock: u128,
    ops: MockOpCounts,
}

/// In-memory filesystem.
///
/// Directories are implicit: a path is a directory when some file lives
/// below it. Every write advances a logical clock that is used as mtime.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let mtime_ms = state.clock;
        state.files.insert(
            path.as_ref().to_path_buf(),
            MockFile {
                content: content.into(),
                mtime_ms,
            },
        );
    }

    /// Bump a file's mtime without changing its content.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let now = state.clock;
        if let Some(file) = state.files.get_mut(path.as_ref()) {
            file.mtime_ms = now;
        }
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path.as_ref())
            .map(|f| String::from_utf8_lossy(&f.content).into_owned())
    }

    pub fn op_counts(&self) -> MockOpCounts {
        self.state.lock().unwrap().ops
    }

    pub fn link_target(&self, link: impl AsRef<Path>) -> Option<PathBuf> {
        self.state.lock().unwrap().links.get(link.as_ref()).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(file) => Ok(file.content.clone()),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path)
            || self.is_dir(path)
            || self.state.lock().unwrap().links.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state
            .files
            .keys()
            .chain(state.links.keys())
            .any(|p| p != path && p.starts_with(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        let mut children: Vec<PathBuf> = state
            .files
            .keys()
            .filter_map(|p| {
                let rel = p.strip_prefix(path).ok()?;
                let first = rel.components().next()?;
                Some(path.join(first.as_os_str()))
            })
            .collect();
        children.dedup();
        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(children)
    }

    fn mtime_ms(&self, path: &Path) -> Result<u128> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .map(|f| f.mtime_ms)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn copy_file(&self, source: &Path, target: &Path) -> Result<()> {
        let content = self.read(source)?;
        self.state.lock().unwrap().ops.copies += 1;
        self.add_file(target, content);
        Ok(())
    }

    fn concat_files(&self, dest: &Path, sources: &[PathBuf]) -> Result<()> {
        let mut buf = Vec::new();
        for source in sources {
            buf.extend_from_slice(&self.read(source)?);
            buf.push(b'\n');
        }
        self.state.lock().unwrap().ops.concats += 1;
        self.add_file(dest, buf);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.removals += 1;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.files.retain(|p, _| !p.starts_with(path));
        state.links.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn symlink_dir(&self, original: &Path, link: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.links.insert(link.to_path_buf(), original.to_path_buf());
        Ok(())
    }
}
