// src/processors/runner.rs

//! Runs one processor over one stage's input.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::build::context::{
    LastOutput, ProcessorFailure, ProcessorInput, ProcessorInputEntry, ProcessorOutput,
    ProcessorOutputEntry,
};
use crate::fs::path_utils::{is_remote, normalize};
use crate::processors::Processor;

/// Process every entry of `input`.
///
/// Entries with `should_compile == false` get their previous output copied
/// into this build instead of being processed; if that copy fails the file
/// is compiled after all. A processor error is recorded as a failure for
/// that file and does not stop the stage.
pub async fn run_stage(processor: &dyn Processor, input: &ProcessorInput) -> ProcessorOutput {
    let mut output = ProcessorOutput::default();

    for entry in input.entries.iter() {
        if !entry.should_compile {
            if let Some(last) = entry.last_output.as_ref() {
                match reuse(entry, last).await {
                    Ok(reused) => {
                        output.entries.push(reused);
                        continue;
                    }
                    Err(err) => debug!(
                        processor = processor.name(),
                        source = ?entry.source,
                        error = %err,
                        "cached output unavailable; compiling"
                    ),
                }
            }
        }

        match compile(processor, entry).await {
            Ok(compiled) => output.entries.push(compiled),
            Err(err) => {
                warn!(
                    processor = processor.name(),
                    source = ?entry.source,
                    error = %err,
                    "processor failed"
                );
                output.failures.push(ProcessorFailure {
                    source: entry.source.clone(),
                    message: format!("{err:#}"),
                });
            }
        }
    }

    debug!(
        processor = processor.name(),
        entries = output.entries.len(),
        failures = output.failures.len(),
        "stage finished"
    );
    output
}

async fn reuse(entry: &ProcessorInputEntry, last: &LastOutput) -> anyhow::Result<ProcessorOutputEntry> {
    if let Some(parent) = last.target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(&last.previous_target, &last.target).await?;
    Ok(ProcessorOutputEntry {
        source: entry.source.clone(),
        target: last.target.clone(),
        contains: last.contains.clone(),
        imported: false,
        compiled: false,
    })
}

async fn compile(processor: &dyn Processor, entry: &ProcessorInputEntry) -> anyhow::Result<ProcessorOutputEntry> {
    if let Some(parent) = entry.target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let processed = processor.process_file(&entry.source, &entry.target).await?;

    let contains: BTreeSet<PathBuf> = processed
        .imports
        .iter()
        .map(|import| resolve_import(&entry.source, import))
        .collect();
    let target = processed.target.unwrap_or_else(|| entry.target.clone());

    Ok(ProcessorOutputEntry::new(entry.source.clone(), target).with_imports(contains))
}

/// Turn an import reported by a processor into a path comparable with the
/// stage's sources. Relative imports are relative to the importing file.
pub fn resolve_import(source: &Path, import: &str) -> PathBuf {
    let path = Path::new(import);
    if is_remote(path) {
        return path.to_path_buf();
    }
    if path.is_absolute() {
        return normalize(path);
    }
    let base = source.parent().unwrap_or(Path::new(""));
    normalize(&base.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{ProcessFuture, ProcessedFile};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uppercases its input; fails for files named `bad.*`.
    struct Upper {
        calls: AtomicUsize,
    }

    impl Processor for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if source.file_stem().is_some_and(|s| s == "bad") {
                    anyhow::bail!("cannot handle {:?}", source);
                }
                let text = tokio::fs::read_to_string(source).await?;
                tokio::fs::write(target, text.to_uppercase()).await?;
                Ok(ProcessedFile {
                    imports: vec!["../shared/vars.txt".into()],
                    target: None,
                })
            })
        }
    }

    fn entry(source: PathBuf, target: PathBuf) -> ProcessorInputEntry {
        ProcessorInputEntry {
            source,
            target,
            should_compile: true,
            last_output: None,
        }
    }

    #[tokio::test]
    async fn failures_are_per_file_and_imports_are_resolved() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("pages")).unwrap();
        std::fs::write(src.join("pages/ok.txt"), "hi").unwrap();
        std::fs::write(src.join("pages/bad.txt"), "no").unwrap();
        let out = tmp.path().join("out");

        let input = ProcessorInput {
            entries: vec![
                entry(src.join("pages/bad.txt"), out.join("pages/bad.txt")),
                entry(src.join("pages/ok.txt"), out.join("pages/ok.txt")),
            ],
        };
        let processor = Upper { calls: AtomicUsize::new(0) };
        let output = run_stage(&processor, &input).await;

        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.entries.len(), 1);
        assert_eq!(std::fs::read_to_string(out.join("pages/ok.txt")).unwrap(), "HI");
        assert!(output.entries[0].contains.contains(&src.join("shared/vars.txt")));
        assert!(output.entries[0].contains.contains(&src.join("pages/ok.txt")));
    }

    #[tokio::test]
    async fn cached_output_is_copied_instead_of_compiled() {
        let tmp = tempfile::tempdir().unwrap();
        let old = tmp.path().join("build-1/a.txt");
        std::fs::create_dir_all(old.parent().unwrap()).unwrap();
        std::fs::write(&old, "CACHED").unwrap();
        let new = tmp.path().join("build-2/a.txt");

        let input = ProcessorInput {
            entries: vec![ProcessorInputEntry {
                source: tmp.path().join("src/a.txt"),
                target: new.clone(),
                should_compile: false,
                last_output: Some(LastOutput {
                    previous_target: old,
                    target: new.clone(),
                    contains: BTreeSet::from([tmp.path().join("src/a.txt")]),
                }),
            }],
        };
        let processor = Upper { calls: AtomicUsize::new(0) };
        let output = run_stage(&processor, &input).await;

        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert!(!output.entries[0].compiled);
        assert_eq!(std::fs::read_to_string(new).unwrap(), "CACHED");
    }

    #[test]
    fn remote_and_absolute_imports_are_kept() {
        let source = Path::new("/p/src/css/site.less");
        assert_eq!(resolve_import(source, "/abs/x.less"), PathBuf::from("/abs/x.less"));
        assert_eq!(resolve_import(source, "../base.less"), PathBuf::from("/p/src/base.less"));
    }
}
