// src/build/state.rs

//! Per-rule build state: the stage/Context chain and, in incremental mode,
//! the dependency maps that decide what must be recompiled.

use std::collections::BTreeSet;
use std::mem;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::build::context::{Context, LastOutput, ProcessorInput, ProcessorInputEntry, ProcessorOutput};
use crate::build::graph::DependencyMap;
use crate::build::rule::Rule;
use crate::build::task::Task;
use crate::errors::{AssetflowError, Result};
use crate::fs::path_utils::rebase;
use crate::types::BuildMode;

/// Absolute directories a build works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirs {
    pub root: PathBuf,
    pub source: PathBuf,
    pub work: PathBuf,
    pub target: PathBuf,
}

/// Data kept between incremental passes.
#[derive(Debug, Clone, Default)]
pub struct IncrementalBuildState {
    /// Targets of the latest stage -> original (stage-0) sources.
    pub target_to_sources: DependencyMap,
    /// Inverse of `target_to_sources`.
    pub source_to_targets: DependencyMap,
    /// Context chain of the previous pass, used to find reusable outputs.
    pub last_build_contexts: Vec<Context>,
    /// Inputs of the next stage that must be compiled, relative to that
    /// stage's source dir.
    recompile: BTreeSet<String>,
}

impl IncrementalBuildState {
    pub fn recompile(&self) -> &BTreeSet<String> {
        &self.recompile
    }
}

/// Mode-specific state of a rule.
#[derive(Debug, Clone)]
pub enum ModeState {
    Full,
    Incremental(IncrementalBuildState),
}

impl ModeState {
    pub fn for_mode(mode: BuildMode) -> Self {
        match mode {
            BuildMode::Full => ModeState::Full,
            BuildMode::Incremental => ModeState::Incremental(IncrementalBuildState::default()),
        }
    }
}

/// Everything one rule needs across its stages and passes.
#[derive(Debug, Clone)]
pub struct RuleState {
    pub rule: Rule,
    dirs: BuildDirs,
    contexts: Vec<Context>,
    build_id: u64,
    mode: ModeState,
    produced: Vec<PathBuf>,
}

impl RuleState {
    pub fn new(rule: Rule, dirs: BuildDirs, mode: BuildMode) -> Self {
        Self {
            rule,
            dirs,
            contexts: Vec::new(),
            build_id: 0,
            mode: ModeState::for_mode(mode),
            produced: Vec::new(),
        }
    }

    pub fn dirs(&self) -> &BuildDirs {
        &self.dirs
    }

    pub fn mode(&self) -> &ModeState {
        &self.mode
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn current_context(&self) -> Option<&Context> {
        self.contexts.last()
    }

    pub fn build_id(&self) -> u64 {
        self.build_id
    }

    /// `<work>/rule-<index>`: parent of every build dir of this rule.
    pub fn work_root(&self) -> PathBuf {
        self.dirs.work.join(format!("rule-{}", self.rule.index))
    }

    pub fn current_build_dir(&self) -> PathBuf {
        self.work_root().join(format!("build-{}", self.build_id))
    }

    /// Targets written to the target dir by the latest finalize.
    pub fn produced(&self) -> &[PathBuf] {
        &self.produced
    }

    pub fn set_produced(&mut self, produced: Vec<PathBuf>) {
        self.produced = produced;
    }

    /// Prepare a new pass.
    ///
    /// With a task (incremental pass), the set of sources to recompile is
    /// computed from the previous pass before the rule's file set is
    /// updated with the task's additions and deletions. Without a task every
    /// file is compiled.
    pub fn before_build(&mut self, task: Option<&Task>) {
        self.build_id += 1;

        let recompile = match task {
            Some(task) => {
                let mut set = BTreeSet::new();
                for file in task.files() {
                    set.extend(self.find_recompile_sources(file));
                }
                for file in task.added.iter() {
                    self.rule.files.insert(file.clone());
                }
                for file in task.deleted.iter() {
                    self.rule.files.remove(file);
                }
                set
            }
            None => self.rule.files.clone(),
        };

        let previous = mem::take(&mut self.contexts);
        match &mut self.mode {
            ModeState::Full => {}
            ModeState::Incremental(inc) => {
                if !self.rule.files.is_empty() {
                    inc.target_to_sources = DependencyMap::identity(self.rule.files.iter().cloned());
                    inc.source_to_targets = inc.target_to_sources.flip();
                }
                debug!(
                    rule = %self.rule,
                    recompile = ?recompile,
                    "prepared incremental pass"
                );
                inc.last_build_contexts = previous;
                inc.recompile = recompile;
            }
        }
    }

    /// Stage-0 sources that must be recompiled because `changed` changed.
    ///
    /// A file nothing was built from is its own answer. Otherwise each final
    /// target built from it is walked back through the context chain, one
    /// stage at a time, to the stage-0 source that produced it. The changed
    /// file itself is always included.
    pub fn find_recompile_sources(&self, changed: &str) -> BTreeSet<String> {
        let mut sources = BTreeSet::from([changed.to_string()]);

        let ModeState::Incremental(inc) = &self.mode else {
            return sources;
        };
        let Some(targets) = inc.source_to_targets.get(changed) else {
            return sources;
        };

        for target in targets {
            let mut key = target.clone();
            let mut resolved = true;
            for ctx in self.contexts.iter().rev() {
                match ctx.source_of(&key) {
                    Some(source) => key = source,
                    None => {
                        resolved = false;
                        break;
                    }
                }
            }
            if resolved {
                sources.insert(key);
            } else {
                debug!(
                    rule = %self.rule,
                    changed,
                    target = %target,
                    "could not trace target back to a stage-0 source"
                );
            }
        }
        sources
    }

    /// Create the next stage's context and return the processor input for it.
    ///
    /// Stage 0 reads the rule's files from the source dir; every later
    /// stage reads the previous stage's non-imported targets from that
    /// stage's working dir.
    pub fn next_input(&mut self) -> ProcessorInput {
        let index = self.contexts.len();
        let (source_dir, input) = match self.contexts.last() {
            None => (self.dirs.source.clone(), self.rule.files.iter().cloned().collect()),
            Some(prev) => (prev.work_dir.clone(), prev.output_targets()),
        };
        let work_dir = self.current_build_dir().join(format!("stage-{index}"));

        let ctx = Context::new(self.dirs.root.clone(), source_dir, work_dir, index, input);
        let entries = ctx
            .input
            .iter()
            .map(|file| self.processor_input(&ctx, file))
            .collect();
        self.contexts.push(ctx);

        ProcessorInput { entries }
    }

    /// Decide whether `file` must be compiled at `ctx`'s stage.
    fn processor_input(&self, ctx: &Context, file: &str) -> ProcessorInputEntry {
        let source = ctx.source_dir.join(file);
        let target = ctx.work_dir.join(file);
        let compile = ProcessorInputEntry {
            source: source.clone(),
            target: target.clone(),
            should_compile: true,
            last_output: None,
        };

        let ModeState::Incremental(inc) = &self.mode else {
            return compile;
        };
        if inc.recompile.contains(file) {
            return compile;
        }
        // Nothing reached this stage last time, or this file failed / is new.
        let Some(last_ctx) = inc.last_build_contexts.get(ctx.index) else {
            return compile;
        };
        let Some(entry) = last_ctx.entry_for_source(file) else {
            return compile;
        };

        let last_output = LastOutput {
            previous_target: entry.target.clone(),
            target: rebase(&entry.target, &last_ctx.work_dir, &ctx.work_dir),
            contains: entry
                .contains
                .iter()
                .map(|p| rebase(p, &last_ctx.source_dir, &ctx.source_dir))
                .collect(),
        };
        ProcessorInputEntry {
            source,
            target,
            should_compile: false,
            last_output: Some(last_output),
        }
    }

    /// Attach a processor's output to the current context.
    ///
    /// Builds the stage's TargetToSources map, marks imported targets and,
    /// in incremental mode, folds the stage into the aggregate maps.
    pub fn save_output(&mut self, mut output: ProcessorOutput) -> Result<()> {
        let ctx = self.contexts.last_mut().ok_or_else(|| {
            AssetflowError::InvariantViolation(format!(
                "rule {} saved output before requesting input",
                self.rule
            ))
        })?;
        if ctx.output.is_some() {
            return Err(AssetflowError::InvariantViolation(format!(
                "rule {} stage {} already has output",
                self.rule, ctx.index
            )));
        }

        let mut tts = DependencyMap::new();
        for entry in output.entries.iter() {
            let Some(target) = ctx.target_rel(&entry.target) else {
                warn!(
                    rule = %self.rule,
                    stage = ctx.index,
                    target = ?entry.target,
                    "processor wrote outside its working dir; ignoring target"
                );
                continue;
            };
            tts.touch(target.clone());
            for path in entry.contains.iter() {
                if let Some(source) = ctx.source_rel(path) {
                    tts.insert(target.clone(), source);
                }
            }
        }

        let imported = tts.imported_targets().map_err(|e| match e {
            AssetflowError::InvariantViolation(msg) => AssetflowError::InvariantViolation(format!(
                "rule {} stage {}: {msg}",
                self.rule, ctx.index
            )),
            other => other,
        })?;
        let mut compiled = BTreeSet::new();
        for entry in output.entries.iter_mut() {
            let Some(target) = ctx.target_rel(&entry.target) else {
                continue;
            };
            entry.imported = imported.contains(&target);
            if entry.compiled {
                compiled.insert(target);
            }
        }
        if !imported.is_empty() {
            debug!(rule = %self.rule, stage = ctx.index, ?imported, "imported targets");
        }

        ctx.output = Some(output);
        ctx.target_to_sources = tts;
        ctx.imported = imported;

        if let ModeState::Incremental(inc) = &mut self.mode {
            inc.target_to_sources = ctx.target_to_sources.trace(&inc.target_to_sources);
            inc.source_to_targets = inc.target_to_sources.flip();
            // Fresh results must not be swapped for stale cached output
            // further down the chain.
            inc.recompile = compiled;
        }

        Ok(())
    }

    /// Source dir and file list for the finalizer: the last stage's
    /// non-imported targets, or the raw files for a rule without processors.
    pub fn finalizer_input(&self) -> (PathBuf, Vec<String>) {
        match self.contexts.last() {
            Some(ctx) => (ctx.work_dir.clone(), ctx.output_targets()),
            None => (self.dirs.source.clone(), self.rule.files.iter().cloned().collect()),
        }
    }
}
