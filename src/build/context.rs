// src/build/context.rs

//! Per-stage data: what a processor is asked to do and what it reported.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::build::graph::DependencyMap;
use crate::fs::path_utils::relative_str;

/// Output of a previous build for the same file at the same stage.
///
/// Paths are already moved into the current build: `target` is where the
/// reused file belongs now and `contains` is rebased onto the current
/// stage's source dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastOutput {
    /// File produced by the previous build.
    pub previous_target: PathBuf,
    pub target: PathBuf,
    pub contains: BTreeSet<PathBuf>,
}

/// One file handed to a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInputEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    /// `false` means the previous result in `last_output` is still valid.
    pub should_compile: bool,
    pub last_output: Option<LastOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorInput {
    pub entries: Vec<ProcessorInputEntry>,
}

impl ProcessorInput {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn compile_count(&self) -> usize {
        self.entries.iter().filter(|e| e.should_compile).count()
    }
}

/// One file a processor produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOutputEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Every file folded into `target`, including `source` itself.
    pub contains: BTreeSet<PathBuf>,
    /// Set by the state once all targets of the stage are known.
    pub imported: bool,
    /// `false` when the entry was reused from the previous build.
    pub compiled: bool,
}

impl ProcessorOutputEntry {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        let source = source.into();
        Self {
            contains: BTreeSet::from([source.clone()]),
            source,
            target: target.into(),
            imported: false,
            compiled: true,
        }
    }

    pub fn with_imports<I, P>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.contains.extend(imports.into_iter().map(Into::into));
        self
    }
}

/// A file the processor could not handle; the rest of the stage continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorFailure {
    pub source: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorOutput {
    pub entries: Vec<ProcessorOutputEntry>,
    pub failures: Vec<ProcessorFailure>,
}

impl ProcessorOutput {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One pipeline stage of one rule in one build.
///
/// `source_dir` holds the stage's input files (the project source dir for
/// stage 0, the previous stage's `work_dir` otherwise); `work_dir` receives
/// the processor's output.
#[derive(Debug, Clone)]
pub struct Context {
    pub root_dir: PathBuf,
    pub source_dir: PathBuf,
    pub work_dir: PathBuf,
    pub index: usize,
    /// Input files relative to `source_dir`.
    pub input: Vec<String>,
    pub output: Option<ProcessorOutput>,
    /// Stage-local map from targets (relative to `work_dir`) to sources
    /// (relative to `source_dir`).
    pub target_to_sources: DependencyMap,
    pub imported: BTreeSet<String>,
}

impl Context {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        index: usize,
        input: Vec<String>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            source_dir: source_dir.into(),
            work_dir: work_dir.into(),
            index,
            input,
            output: None,
            target_to_sources: DependencyMap::new(),
            imported: BTreeSet::new(),
        }
    }

    pub fn source_rel(&self, path: &Path) -> Option<String> {
        relative_str(&self.source_dir, path)
    }

    pub fn target_rel(&self, path: &Path) -> Option<String> {
        relative_str(&self.work_dir, path)
    }

    /// Output entries, empty before `save_output`.
    pub fn output_entries(&self) -> &[ProcessorOutputEntry] {
        self.output.as_ref().map(|o| o.entries.as_slice()).unwrap_or(&[])
    }

    /// Non-imported targets in output order, relative to `work_dir`.
    pub fn output_targets(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.output_entries()
            .iter()
            .filter(|e| !e.imported)
            .filter_map(|e| self.target_rel(&e.target))
            .filter(|rel| seen.insert(rel.clone()))
            .collect()
    }

    /// The input file (relative to `source_dir`) that produced `target_rel`.
    pub fn source_of(&self, target_rel: &str) -> Option<String> {
        self.output_entries()
            .iter()
            .find(|e| self.target_rel(&e.target).as_deref() == Some(target_rel))
            .and_then(|e| self.source_rel(&e.source))
    }

    /// The output entry this stage produced for input `source_rel`.
    pub fn entry_for_source(&self, source_rel: &str) -> Option<&ProcessorOutputEntry> {
        self.output_entries()
            .iter()
            .find(|e| self.source_rel(&e.source).as_deref() == Some(source_rel))
    }
}
