// src/build/finalizer.rs

//! Materialises a rule's final outputs in the target dir.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::model::RuleTargets;
use crate::fs::FileSystem;

/// One unit of finalize work, with paths relative to the source / target dirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeStep {
    Copy { source: String, target: String },
    /// Sources are concatenated in this order.
    Merge { sources: Vec<String>, target: String },
}

impl FinalizeStep {
    pub fn target(&self) -> &str {
        match self {
            FinalizeStep::Copy { target, .. } | FinalizeStep::Merge { target, .. } => target,
        }
    }
}

/// Work out copy / merge steps purely from the arity of sources vs.
/// declared targets.
///
/// - no declared target: every source is copied to its own relative path;
/// - one declared target: everything is merged into it;
/// - several: the leading sources are copied one-to-one and the remainder is
///   merged into the last target. Declared targets beyond the number of
///   sources are dropped.
pub fn plan(targets: &RuleTargets, sources: &[String]) -> Vec<FinalizeStep> {
    if sources.is_empty() {
        return Vec::new();
    }

    let mut declared = targets.as_list();
    if declared.is_empty() {
        return sources
            .iter()
            .map(|s| FinalizeStep::Copy {
                source: s.clone(),
                target: s.clone(),
            })
            .collect();
    }

    if declared.len() > sources.len() {
        debug!(
            declared = declared.len(),
            sources = sources.len(),
            "dropping declared targets without a matching source"
        );
        declared.truncate(sources.len());
    }

    let last = declared.len() - 1;
    let mut steps: Vec<FinalizeStep> = declared[..last]
        .iter()
        .zip(sources.iter())
        .map(|(t, s)| FinalizeStep::Copy {
            source: s.clone(),
            target: t.clone(),
        })
        .collect();
    steps.push(FinalizeStep::Merge {
        sources: sources[last..].to_vec(),
        target: declared[last].clone(),
    });
    steps
}

/// Result of finalizing one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Every target this rule owns, written or not.
    pub targets: Vec<PathBuf>,
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
}

impl FinalizeReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered inputs of one target with their mtimes when it was last written.
type Inputs = Vec<(PathBuf, u128)>;

/// Copies and merges final outputs, skipping targets whose inputs (the same
/// files, in the same order, with the same mtimes) have not changed since
/// this finalizer last wrote them.
///
/// The cache belongs to the instance and is shared by every rule the builder
/// finalizes. It is advisory: a lost update only costs a redundant copy.
#[derive(Debug)]
pub struct Finalizer {
    fs: Arc<dyn FileSystem>,
    written: Mutex<HashMap<PathBuf, Inputs>>,
}

impl Finalizer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn finalize(
        &self,
        targets: &RuleTargets,
        source_dir: &Path,
        sources: &[String],
        target_dir: &Path,
    ) -> FinalizeReport {
        let mut report = FinalizeReport::default();

        for step in plan(targets, sources) {
            let target = target_dir.join(step.target());
            let result = match &step {
                FinalizeStep::Copy { source, .. } => self.copy(&source_dir.join(source), &target),
                FinalizeStep::Merge { sources, .. } => {
                    let paths: Vec<PathBuf> = sources.iter().map(|s| source_dir.join(s)).collect();
                    self.merge(&paths, &target)
                }
            };
            match result {
                Ok(true) => report.written += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    warn!(target = ?target, error = %err, "failed to finalize target");
                    report.failures.push(format!("{}: {err:#}", target.display()));
                }
            }
            report.targets.push(target);
        }

        report
    }

    /// Returns whether anything was written.
    fn copy(&self, source: &Path, target: &Path) -> Result<bool> {
        let inputs = self.inputs(&[source.to_path_buf()])?;
        if self.unchanged(target, &inputs) {
            debug!(?source, ?target, "source unchanged; skipping copy");
            return Ok(false);
        }
        self.fs.copy_file(source, target)?;
        self.remember(target, inputs);
        Ok(true)
    }

    fn merge(&self, sources: &[PathBuf], target: &Path) -> Result<bool> {
        let inputs = self.inputs(sources)?;
        if self.unchanged(target, &inputs) {
            debug!(?target, "merge inputs unchanged; skipping merge");
            return Ok(false);
        }
        self.fs.concat_files(target, sources)?;
        self.remember(target, inputs);
        Ok(true)
    }

    fn inputs(&self, sources: &[PathBuf]) -> Result<Inputs> {
        sources
            .iter()
            .map(|source| Ok((source.clone(), self.fs.mtime_ms(source)?)))
            .collect()
    }

    fn unchanged(&self, target: &Path, inputs: &Inputs) -> bool {
        let cache = self.written.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(target) == Some(inputs) && self.fs.exists(target)
    }

    fn remember(&self, target: &Path, inputs: Inputs) {
        let mut cache = self.written.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(target.to_path_buf(), inputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (MockFileSystem, Finalizer) {
        let fs = MockFileSystem::new();
        fs.add_file("/w/a.css", "a");
        fs.add_file("/w/b.css", "b");
        fs.add_file("/w/c.css", "c");
        let finalizer = Finalizer::new(Arc::new(fs.clone()));
        (fs, finalizer)
    }

    #[test]
    fn three_sources_no_targets_copy_one_to_one() {
        let steps = plan(&RuleTargets::None, &names(&["a.css", "b.css", "c.css"]));
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| matches!(s, FinalizeStep::Copy { source, target } if source == target)));
    }

    #[test]
    fn three_sources_one_target_merge_in_input_order() {
        let (fs, finalizer) = setup();
        let report = finalizer.finalize(
            &RuleTargets::One("all.css".into()),
            Path::new("/w"),
            &names(&["c.css", "a.css", "b.css"]),
            Path::new("/t"),
        );
        assert_eq!(report.targets, vec![PathBuf::from("/t/all.css")]);
        assert_eq!(fs.contents("/t/all.css").unwrap(), "c\na\nb\n");
    }

    #[test]
    fn three_sources_two_targets_copy_first_and_merge_rest() {
        let (fs, finalizer) = setup();
        let report = finalizer.finalize(
            &RuleTargets::Many(names(&["first.css", "rest.css"])),
            Path::new("/w"),
            &names(&["a.css", "b.css", "c.css"]),
            Path::new("/t"),
        );
        assert!(report.is_success());
        assert_eq!(fs.contents("/t/first.css").unwrap(), "a");
        assert_eq!(fs.contents("/t/rest.css").unwrap(), "b\nc\n");
        assert_eq!(fs.op_counts().copies, 1);
        assert_eq!(fs.op_counts().concats, 1);
    }

    #[test]
    fn excess_declared_targets_are_dropped() {
        let steps = plan(
            &RuleTargets::Many(names(&["x", "y", "z"])),
            &names(&["a", "b"]),
        );
        assert_eq!(
            steps,
            vec![
                FinalizeStep::Copy { source: "a".into(), target: "x".into() },
                FinalizeStep::Merge { sources: names(&["b"]), target: "y".into() },
            ]
        );
    }

    #[test]
    fn unchanged_mtimes_skip_all_work_on_second_call() {
        let (fs, finalizer) = setup();
        let sources = names(&["a.css", "b.css", "c.css"]);
        let targets = RuleTargets::Many(names(&["first.css", "rest.css"]));

        finalizer.finalize(&targets, Path::new("/w"), &sources, Path::new("/t"));
        let before = fs.op_counts();

        let report = finalizer.finalize(&targets, Path::new("/w"), &sources, Path::new("/t"));
        assert_eq!(fs.op_counts(), before);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.targets.len(), 2);

        // One touched merge input re-runs the merge but not the copy.
        fs.touch("/w/c.css");
        finalizer.finalize(&targets, Path::new("/w"), &sources, Path::new("/t"));
        assert_eq!(fs.op_counts().concats, before.concats + 1);
        assert_eq!(fs.op_counts().copies, before.copies);
    }

    #[test]
    fn dropped_merge_input_rewrites_the_target() {
        let (fs, finalizer) = setup();
        let target = RuleTargets::One("all.css".into());

        finalizer.finalize(&target, Path::new("/w"), &names(&["a.css", "b.css"]), Path::new("/t"));
        assert_eq!(fs.contents("/t/all.css").unwrap(), "a\nb\n");

        let report = finalizer.finalize(&target, Path::new("/w"), &names(&["a.css"]), Path::new("/t"));
        assert_eq!(report.written, 1);
        assert_eq!(fs.contents("/t/all.css").unwrap(), "a\n");
    }

    #[test]
    fn source_moving_to_another_target_is_copied_again() {
        let (fs, finalizer) = setup();
        let targets = RuleTargets::Many(names(&["first.css", "rest.css"]));

        finalizer.finalize(&targets, Path::new("/w"), &names(&["a.css", "b.css", "c.css"]), Path::new("/t"));
        assert_eq!(fs.contents("/t/first.css").unwrap(), "a");

        // a.css is gone, so b.css now leads.
        let report = finalizer.finalize(&targets, Path::new("/w"), &names(&["b.css", "c.css"]), Path::new("/t"));
        assert_eq!(report.written, 2);
        assert_eq!(fs.contents("/t/first.css").unwrap(), "b");
        assert_eq!(fs.contents("/t/rest.css").unwrap(), "c\n");
    }

    #[test]
    fn missing_source_is_reported_not_fatal() {
        let (_fs, finalizer) = setup();
        let report = finalizer.finalize(
            &RuleTargets::None,
            Path::new("/w"),
            &names(&["a.css", "gone.css"]),
            Path::new("/t"),
        );
        assert_eq!(report.written, 1);
        assert_eq!(report.failures.len(), 1);
    }
}
