// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod processors;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::build::{BuildReport, Builder};
use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::BuilderPassExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::processors::ProcessorRegistry;
use crate::types::BuildMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the processor registry
/// - the initial full build
/// - (unless `--once`) the file watcher, runtime and pass executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let registry = ProcessorRegistry::with_builtins()?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mode = if args.once {
        BuildMode::Full
    } else {
        BuildMode::Incremental
    };
    let mut builder = Builder::new(&cfg, &registry, fs, mode)?;

    if args.dry_run {
        print_dry_run(&cfg, &builder)?;
        return Ok(());
    }

    let report = builder.build().await?;
    print_build_report(&report);

    if args.once {
        if !report.status.is_success() {
            bail!("build failed");
        }
        return Ok(());
    }

    watch(&cfg, builder).await
}

/// Watch mode: incremental passes until Ctrl-C.
async fn watch(cfg: &ConfigFile, builder: Builder) -> Result<()> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    let watcher = crate::watch::spawn_watcher(
        builder.dirs().source.clone(),
        builder.matcher(),
        rt_tx.clone(),
    )?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let executor = BuilderPassExecutor::new(Arc::new(Mutex::new(builder)), rt_tx);
    let core = CoreRuntime::new(RuntimeOptions {
        debounce: Duration::from_millis(cfg.config.debounce_ms),
    });

    info!(debounce_ms = cfg.config.debounce_ms, "watching for changes");
    Runtime::new(core, rt_rx, executor)
        .with_watcher(watcher)
        .run()
        .await?;
    Ok(())
}

fn print_build_report(report: &BuildReport) {
    for failure in report.failures() {
        eprintln!("[assetflow] {failure}");
    }
    println!("[assetflow] build {}", report.status.full_build_label());
}

/// Print the effective rules and the files each one owns.
fn print_dry_run(cfg: &ConfigFile, builder: &Builder) -> Result<()> {
    let dirs = builder.dirs();
    println!("assetflow dry-run");
    println!("  source_dir = {}", dirs.source.display());
    println!("  target_dir = {}", dirs.target.display());
    println!("  work_dir = {}", dirs.work.display());
    println!("  debounce_ms = {}", cfg.config.debounce_ms);
    println!();

    let assigned = builder.scan()?;
    println!("rules ({}):", cfg.rules.len());
    for (idx, rule) in cfg.rules.iter().enumerate() {
        println!("  #{idx} {:?}", rule.sources);
        let targets = rule.targets.as_list();
        if !targets.is_empty() {
            println!("      targets: {:?}", targets);
        }
        if !rule.processors.is_empty() {
            println!("      processors: {:?}", rule.processors);
        }
        let files = assigned.get(&idx).map(Vec::as_slice).unwrap_or(&[]);
        println!("      files ({}):", files.len());
        for file in files {
            println!("        {file}");
        }
    }

    debug!("dry-run complete (nothing processed)");
    Ok(())
}
