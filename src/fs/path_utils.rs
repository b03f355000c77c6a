// src/fs/path_utils.rs

//! Path normalisation shared by the builder and the watcher.

use std::path::{Component, Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - Only if both attempts fail do we give up.
///
/// Returns `None` if the path cannot be reasonably related to `root`, which
/// includes remote URLs.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if is_remote(path) {
        return None;
    }

    if let Ok(rel) = normalize(path).strip_prefix(normalize(root)) {
        return non_empty(rel);
    }

    // Different absolute prefixes may name the same directory (symlinks,
    // /private/var on macOS).
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return non_empty(rel);
        }
    }

    None
}

fn non_empty(rel: &Path) -> Option<String> {
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.is_empty() { None } else { Some(s) }
}

/// True for `scheme://...` references that never map onto local files.
pub fn is_remote(path: &Path) -> bool {
    path.to_string_lossy().contains("://")
}

/// Lexically resolve `.` and `..` components without touching the disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute (against the current dir) and normalised.
pub fn absolutize(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize(&abs)
}

/// Move `path` from below `from` to the same relative place below `to`.
/// Paths outside `from` are returned unchanged.
pub fn rebase(path: &Path, from: &Path, to: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rel) => to.join(rel),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_str_uses_forward_slashes_and_rejects_outsiders() {
        let root = Path::new("/site/src");
        assert_eq!(
            relative_str(root, Path::new("/site/src/css/a.less")).as_deref(),
            Some("css/a.less")
        );
        assert_eq!(relative_str(root, Path::new("/site/src/../src/b.less")).as_deref(), Some("b.less"));
        assert_eq!(relative_str(root, Path::new("/elsewhere/c.less")), None);
        assert_eq!(relative_str(root, Path::new("https://cdn.example/x.css")), None);
    }

    #[test]
    fn rebase_moves_between_work_dirs() {
        let moved = rebase(
            Path::new("/w/rule-2/build-1/stage-0/a.css"),
            Path::new("/w/rule-2/build-1/stage-0"),
            Path::new("/w/rule-2/build-2/stage-0"),
        );
        assert_eq!(moved, PathBuf::from("/w/rule-2/build-2/stage-0/a.css"));
    }
}
