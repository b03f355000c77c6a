#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::TempDir;

/// A throwaway project directory with the default `src` / `public` layout.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("creating temp project dir");
        fs::create_dir_all(dir.path().join("src")).expect("creating src dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source(&self, rel: &str) -> PathBuf {
        self.root().join("src").join(rel)
    }

    pub fn target(&self, rel: &str) -> PathBuf {
        self.root().join("public").join(rel)
    }

    /// Write a source file, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> &Self {
        let path = self.source(rel);
        fs::create_dir_all(path.parent().expect("source file has a parent"))
            .expect("creating source dirs");
        fs::write(&path, contents).expect("writing source file");
        self
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.source(rel)).expect("removing source file");
    }

    /// Write `Assetflow.toml` at the project root and return its path.
    pub fn write_config(&self, toml: &str) -> PathBuf {
        let path = self.root().join("Assetflow.toml");
        fs::write(&path, toml).expect("writing config");
        path
    }

    pub fn read_target(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.target(rel)).ok()
    }

    pub fn target_mtime(&self, rel: &str) -> SystemTime {
        fs::metadata(self.target(rel))
            .and_then(|m| m.modified())
            .expect("reading target mtime")
    }

    /// Every file under the target dir, relative, sorted.
    pub fn target_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        let root = self.root().join("public");
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&root) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
