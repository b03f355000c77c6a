// src/build/builder.rs

//! Full and incremental build passes.
//!
//! A pass runs every affected rule concurrently; inside a rule the
//! processor stages run one after another. Once all rules are done, the
//! target dir is cleaned of everything no rule produced.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::build::finalizer::Finalizer;
use crate::build::rule::{Rule, RuleMatcher};
use crate::build::state::{BuildDirs, RuleState};
use crate::build::task::Task;
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::fs::path_utils::absolutize;
use crate::fs::{FileSystem, clean_directory, list_all_files};
use crate::processors::{Processor, ProcessorRegistry, run_stage};
use crate::types::{BuildMode, BuildStatus, EditKind};

/// Outcome of one rule in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleReport {
    pub index: usize,
    pub files: usize,
    /// Entries actually handed to a processor, summed over all stages.
    pub compiled: usize,
    pub produced: usize,
    pub failures: Vec<String>,
}

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub status: BuildStatus,
    pub rules: Vec<RuleReport>,
    /// Stale targets that could not be removed.
    pub clean_failures: usize,
}

impl BuildReport {
    pub fn failures(&self) -> impl Iterator<Item = &String> {
        self.rules.iter().flat_map(|r| r.failures.iter())
    }
}

/// Everything a rule task needs besides its own state.
#[derive(Clone)]
struct Shared {
    fs: Arc<dyn FileSystem>,
    finalizer: Arc<Finalizer>,
    link_dirs: Arc<Vec<String>>,
}

pub struct Builder {
    dirs: BuildDirs,
    states: Vec<Arc<Mutex<RuleState>>>,
    chains: Vec<Vec<Arc<dyn Processor>>>,
    matcher: Arc<RuleMatcher>,
    shared: Shared,
    mode: BuildMode,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("dirs", &self.dirs)
            .field("rules", &self.states.len())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Resolve directories, compile rule patterns and look up every rule's
    /// processor chain. Unknown processors are an error here, before any
    /// file is touched.
    pub fn new(
        cfg: &ConfigFile,
        registry: &ProcessorRegistry,
        fs: Arc<dyn FileSystem>,
        mode: BuildMode,
    ) -> Result<Self> {
        let dirs = BuildDirs {
            root: absolutize(cfg.root_dir()),
            source: absolutize(&cfg.source_dir()),
            work: absolutize(&cfg.work_dir()),
            target: absolutize(&cfg.target_dir()),
        };

        let matcher = RuleMatcher::from_specs(&cfg.rules)?;
        let mut chains = Vec::with_capacity(cfg.rules.len());
        let mut states = Vec::with_capacity(cfg.rules.len());
        for (index, spec) in cfg.rules.iter().enumerate() {
            chains.push(registry.resolve_chain(index, &spec.processors)?);
            let rule = Rule::new(index, spec.clone());
            states.push(Arc::new(Mutex::new(RuleState::new(rule, dirs.clone(), mode))));
        }

        debug!(?dirs, rules = states.len(), ?mode, "builder ready");
        Ok(Self {
            dirs,
            states,
            chains,
            matcher: Arc::new(matcher),
            shared: Shared {
                finalizer: Arc::new(Finalizer::new(fs.clone())),
                fs,
                link_dirs: Arc::new(cfg.config.link_dirs.clone()),
            },
            mode,
        })
    }

    pub fn dirs(&self) -> &BuildDirs {
        &self.dirs
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Rule matcher shared with the watcher.
    pub fn matcher(&self) -> Arc<RuleMatcher> {
        self.matcher.clone()
    }

    /// Watch events for `file` are irrelevant: no rule matches it or its
    /// rule has no processors.
    pub fn should_ignore(&self, file: &str) -> bool {
        self.matcher.should_ignore(file)
    }

    /// Snapshot of one rule's state.
    pub async fn rule_state(&self, index: usize) -> Option<RuleState> {
        let state = self.states.get(index)?;
        Some(state.lock().await.clone())
    }

    /// Scan the source dir once and return each rule's files.
    pub fn scan(&self) -> Result<BTreeMap<usize, Vec<String>>> {
        let mut assigned: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for file in list_all_files(self.shared.fs.as_ref(), &self.dirs.source)? {
            match self.matcher.match_rule(&file) {
                Some(idx) => assigned.entry(idx).or_default().push(file),
                None => debug!(file, "no rule matches; skipping"),
            }
        }
        Ok(assigned)
    }

    /// Build everything from scratch.
    pub async fn build(&mut self) -> Result<BuildReport> {
        let mut assigned = self.scan()?;
        for state in self.states.iter() {
            let mut state = state.lock().await;
            state.rule.files = assigned
                .remove(&state.rule.index)
                .unwrap_or_default()
                .into_iter()
                .collect();
            state.before_build(None);
        }

        let all: Vec<usize> = (0..self.states.len()).collect();
        info!(rules = all.len(), source = ?self.dirs.source, "starting full build");
        self.run_pass(&all).await
    }

    /// Rebuild only what the net `edits` (relative to the source dir)
    /// affect.
    pub async fn incremental(&mut self, edits: &[(String, EditKind)]) -> Result<BuildReport> {
        let mut tasks: BTreeMap<usize, Task> = BTreeMap::new();
        for (file, kind) in edits {
            if self.matcher.should_ignore(file) {
                debug!(file, %kind, "edit ignored");
                continue;
            }
            if let Some(idx) = self.matcher.match_rule(file) {
                tasks.entry(idx).or_default().record(*kind, file.clone());
            }
        }

        for (idx, task) in tasks.iter() {
            self.states[*idx].lock().await.before_build(Some(task));
        }

        let affected: Vec<usize> = tasks.keys().copied().collect();
        info!(rules = ?affected, edits = edits.len(), "starting incremental pass");
        self.run_pass(&affected).await
    }

    async fn run_pass(&self, indices: &[usize]) -> Result<BuildReport> {
        let mut set = JoinSet::new();
        for &idx in indices {
            let state = self.states[idx].clone();
            let chain = self.chains[idx].clone();
            let shared = self.shared.clone();
            set.spawn(async move {
                let mut state = state.lock().await;
                invoke_processors(&mut state, &chain, &shared).await
            });
        }

        let mut rules = Vec::with_capacity(indices.len());
        let mut fatal = None;
        while let Some(joined) = set.join_next().await {
            match joined.map_err(|e| anyhow!("rule task failed: {e}")) {
                Ok(Ok(report)) => rules.push(report),
                Ok(Err(err)) => {
                    fatal.get_or_insert(err);
                }
                Err(err) => {
                    fatal.get_or_insert(err.into());
                }
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }
        rules.sort_by_key(|r| r.index);

        let mut keep = HashSet::new();
        for state in self.states.iter() {
            keep.extend(state.lock().await.produced().iter().cloned());
        }
        let clean_failures = clean_directory(self.shared.fs.as_ref(), &self.dirs.target, &keep);

        let success = clean_failures == 0 && rules.iter().all(|r| r.failures.is_empty());
        Ok(BuildReport {
            status: BuildStatus::from_success(success),
            rules,
            clean_failures,
        })
    }
}

/// Run one rule's processor chain, finalize its outputs and prune its
/// older build dirs.
async fn invoke_processors(
    state: &mut RuleState,
    chain: &[Arc<dyn Processor>],
    shared: &Shared,
) -> Result<RuleReport> {
    let mut report = RuleReport {
        index: state.rule.index,
        files: state.rule.files.len(),
        ..Default::default()
    };

    if state.rule.files.is_empty() {
        state.set_produced(Vec::new());
        prune_build_dirs(shared.fs.as_ref(), state);
        return Ok(report);
    }

    for processor in chain {
        let input = state.next_input();
        report.compiled += input.compile_count();
        if let Some(ctx) = state.current_context() {
            ensure_links(shared.fs.as_ref(), &state.dirs().root, &ctx.work_dir, &shared.link_dirs);
        }

        let output = run_stage(processor.as_ref(), &input).await;
        report.failures.extend(
            output
                .failures
                .iter()
                .map(|f| format!("{} ({}): {}", f.source.display(), processor.name(), f.message)),
        );
        state.save_output(output)?;
    }

    let (source_dir, files) = state.finalizer_input();
    let targets = state.rule.spec.targets.clone();
    let target_dir = state.dirs().target.clone();
    let finalizer = shared.finalizer.clone();
    let finalized = tokio::task::spawn_blocking(move || {
        finalizer.finalize(&targets, &source_dir, &files, &target_dir)
    })
    .await
    .map_err(|e| anyhow!("finalize task failed: {e}"))?;

    report.produced = finalized.targets.len();
    report.failures.extend(finalized.failures);
    state.set_produced(finalized.targets);
    prune_build_dirs(shared.fs.as_ref(), state);

    if report.failures.is_empty() {
        debug!(rule = %state.rule, compiled = report.compiled, "rule done");
    } else {
        warn!(rule = %state.rule, failures = report.failures.len(), "rule finished with failures");
    }
    Ok(report)
}

/// Expose dependency roots (e.g. `node_modules`) inside a stage's working
/// dir so processors resolve packages the same way as from the project.
fn ensure_links(fs: &dyn FileSystem, root: &Path, work_dir: &Path, link_dirs: &[String]) {
    for name in link_dirs {
        let original = root.join(name);
        let link = work_dir.join(name);
        if !fs.is_dir(&original) || fs.exists(&link) {
            continue;
        }
        if let Err(err) = fs.symlink_dir(&original, &link) {
            warn!(?link, error = %err, "failed to link dependency dir");
        }
    }
}

/// Remove every build dir of the rule except the current one.
fn prune_build_dirs(fs: &dyn FileSystem, state: &RuleState) {
    let root = state.work_root();
    if !fs.is_dir(&root) {
        return;
    }
    let current = state.current_build_dir();
    let entries: Vec<PathBuf> = match fs.read_dir(&root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(?root, error = %err, "failed to list build dirs");
            return;
        }
    };
    for dir in entries.into_iter().filter(|d| *d != current) {
        if let Err(err) = fs.remove_dir_all(&dir) {
            warn!(?dir, error = %err, "failed to prune build dir");
        }
    }
}
