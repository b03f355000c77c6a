// src/processors/mod.rs

//! Content processors.
//!
//! A processor transforms one file at a time and reports which other files
//! it pulled in. Everything around that (cached-output reuse, failure
//! collection, import resolution) lives in [`runner`], so processors stay
//! unaware of incremental builds.
//!
//! - [`registry`] maps processor names used in rules to implementations.
//! - [`css`], [`html`] and [`js`] hold the built-in text processors.

use std::collections::HashSet;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::{Context, Result, bail};
use regex::Regex;

pub mod css;
pub mod html;
pub mod js;
pub mod registry;
pub mod runner;

pub use registry::ProcessorRegistry;
pub use runner::run_stage;

/// What a processor reports for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedFile {
    /// Files folded into the output: absolute paths, paths relative to the
    /// processed file's directory, or remote URLs.
    pub imports: Vec<String>,
    /// Set when the processor wrote somewhere other than the suggested
    /// target (e.g. `style.less` -> `style.css`).
    pub target: Option<PathBuf>,
}

pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<ProcessedFile>> + Send + 'a>>;

/// Transformation applied to every file of a pipeline stage.
///
/// Returning `Err` marks only this file as failed; the stage goes on with
/// the remaining files.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a>;
}

/// Run synchronous file work on the blocking pool.
pub(crate) fn blocking<F>(f: F) -> ProcessFuture<'static>
where
    F: FnOnce() -> Result<ProcessedFile> + Send + 'static,
{
    Box::pin(async move { tokio::task::spawn_blocking(f).await? })
}

pub(crate) fn write_target(target: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    fs::write(target, contents).with_context(|| format!("writing {:?}", target))
}

/// Recursively replace import statements matched by `pattern` (capture
/// group 1 holds the path) with the imported file's contents.
///
/// Each file is inlined at most once. Remote imports are left in place.
/// Imports without an extension get `default_ext`. Returns the expanded
/// text and every local file that was inlined.
pub(crate) fn inline_imports(
    source: &Path,
    pattern: &Regex,
    default_ext: &str,
) -> Result<(String, Vec<PathBuf>)> {
    let mut seen = HashSet::from([source.to_path_buf()]);
    let mut imports = Vec::new();
    let text = expand(source, pattern, default_ext, &mut seen, &mut imports)?;
    Ok((text, imports))
}

fn expand(
    file: &Path,
    pattern: &Regex,
    default_ext: &str,
    seen: &mut HashSet<PathBuf>,
    imports: &mut Vec<PathBuf>,
) -> Result<String> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {:?}", file))?;
    let dir = file.parent().unwrap_or(Path::new("."));

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(&text) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if spec.as_str().contains("://") {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let mut path = crate::fs::path_utils::normalize(&dir.join(spec.as_str()));
        if path.extension().is_none() {
            path.set_extension(default_ext);
        }
        if !path.is_file() {
            bail!("{:?} imports missing file {:?}", file, path);
        }
        if seen.insert(path.clone()) {
            imports.push(path.clone());
            out.push_str(&expand(&path, pattern, default_ext, seen, imports)?);
            out.push('\n');
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}
