// tests/watch_end_to_end.rs

use std::error::Error;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::time::{Duration, Instant, sleep};

use assetflow::build::Builder;
use assetflow::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use assetflow::exec::BuilderPassExecutor;
use assetflow::fs::RealFileSystem;
use assetflow::processors::ProcessorRegistry;
use assetflow::types::{BuildMode, BuildStatus};
use assetflow::watch::spawn_watcher;
use assetflow_test_utils::builders::ConfigFileBuilder;
use assetflow_test_utils::project::Project;
use assetflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE_MS: u64 = 100;
const CSS_RULE: usize = 2;

fn project() -> Project {
    let project = Project::new();
    project
        .write("css/site.less", "h1 { margin: 1px; }\n")
        .write("js/app.js", "var app = 1;\n")
        .write("index.html", "<p>hi</p>\n");
    project
}

/// Full build, then the same wiring `assetflow` uses in watch mode.
async fn start_watching(
    project: &Project,
) -> Result<
    (
        Arc<Mutex<Builder>>,
        mpsc::Sender<RuntimeEvent>,
        tokio::task::JoinHandle<assetflow::errors::Result<()>>,
    ),
    Box<dyn Error>,
> {
    let cfg = ConfigFileBuilder::new()
        .debounce_ms(DEBOUNCE_MS)
        .build_at(project.root());
    let mut builder = Builder::new(
        &cfg,
        &ProcessorRegistry::with_builtins()?,
        Arc::new(RealFileSystem),
        BuildMode::Incremental,
    )?;
    assert_eq!(builder.build().await?.status, BuildStatus::Success);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let watcher = spawn_watcher(builder.dirs().source.clone(), builder.matcher(), rt_tx.clone())?;
    let builder = Arc::new(Mutex::new(builder));
    let executor = BuilderPassExecutor::new(builder.clone(), rt_tx.clone());
    let core = CoreRuntime::new(RuntimeOptions {
        debounce: Duration::from_millis(DEBOUNCE_MS),
    });
    let handle = tokio::spawn(Runtime::new(core, rt_rx, executor).with_watcher(watcher).run());
    sleep(Duration::from_millis(100)).await;
    Ok((builder, rt_tx, handle))
}

/// Build ids of every rule; each pass a rule takes part in bumps its id.
async fn build_ids(builder: &Mutex<Builder>) -> Vec<u64> {
    let builder = builder.lock().await;
    let mut ids = Vec::new();
    let mut idx = 0;
    while let Some(state) = builder.rule_state(idx).await {
        ids.push(state.build_id());
        idx += 1;
    }
    ids
}

async fn wait_for_css_pass(builder: &Mutex<Builder>, before: &[u64]) -> Vec<u64> {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let ids = build_ids(builder).await;
        if ids[CSS_RULE] > before[CSS_RULE] || Instant::now() > deadline {
            return ids;
        }
        sleep(Duration::from_millis(20)).await;
    }
}

async fn stop(
    tx: mpsc::Sender<RuntimeEvent>,
    handle: tokio::task::JoinHandle<assetflow::errors::Result<()>>,
) -> TestResult {
    tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;
    Ok(())
}

#[tokio::test]
async fn edited_stylesheet_runs_one_pass_over_the_css_rule() -> TestResult {
    init_tracing();
    let project = project();
    let (builder, tx, handle) = start_watching(&project).await?;
    let before = build_ids(&builder).await;

    project.write("css/site.less", "h1 { margin: 2px; }\n");
    let after = wait_for_css_pass(&builder, &before).await;
    // Quiet period: nothing else may start.
    sleep(Duration::from_millis(DEBOUNCE_MS * 4)).await;
    let settled = build_ids(&builder).await;
    stop(tx, handle).await?;

    assert_eq!(after, settled);
    for (idx, (b, a)) in before.iter().zip(after.iter()).enumerate() {
        let expected = if idx == CSS_RULE { b + 1 } else { *b };
        assert_eq!(*a, expected, "rule #{idx}");
    }
    assert_eq!(project.read_target("css/site.css").unwrap(), "h1{margin:2px}");
    Ok(())
}

#[tokio::test]
async fn touched_stylesheet_runs_one_pass() -> TestResult {
    init_tracing();
    let project = project();
    let (builder, tx, handle) = start_watching(&project).await?;
    let before = build_ids(&builder).await;

    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(project.source("css/site.less"))?;
    file.set_modified(std::time::SystemTime::now() + Duration::from_secs(5))?;
    drop(file);

    let after = wait_for_css_pass(&builder, &before).await;
    sleep(Duration::from_millis(DEBOUNCE_MS * 4)).await;
    let settled = build_ids(&builder).await;
    stop(tx, handle).await?;

    assert_eq!(after, settled);
    assert_eq!(after[CSS_RULE], before[CSS_RULE] + 1);
    assert_eq!(project.read_target("css/site.css").unwrap(), "h1{margin:1px}");
    Ok(())
}
