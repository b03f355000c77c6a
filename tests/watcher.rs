// tests/watcher.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};

use assetflow::build::RuleMatcher;
use assetflow::config::default_rules;
use assetflow::engine::RuntimeEvent;
use assetflow::types::EditKind;
use assetflow::watch::spawn_watcher;
use assetflow_test_utils::init_tracing;

/// Next `FileEdited` event, skipping nothing else since the watcher only
/// sends those.
async fn next_edit(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Option<(String, EditKind)> {
    match timeout(Duration::from_secs(3), rx.recv()).await {
        Ok(Some(RuntimeEvent::FileEdited { path, kind })) => Some((path, kind)),
        _ => None,
    }
}

#[tokio::test]
async fn watcher_reports_source_relative_edits_for_processed_files() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("css")).unwrap();

    let matcher = Arc::new(RuleMatcher::from_specs(&default_rules()).unwrap());
    let (tx, mut rx) = mpsc::channel(64);
    let _handle = spawn_watcher(&src, matcher, tx).unwrap();
    sleep(Duration::from_millis(100)).await;

    // Pure-copy files never reach the runtime.
    std::fs::write(src.join("logo.png"), "png").unwrap();
    std::fs::write(src.join("css/site.less"), "a { }").unwrap();

    let (path, kind) = next_edit(&mut rx).await.expect("edit for site.less");
    assert_eq!(path, "css/site.less");
    assert!(matches!(kind, EditKind::Add | EditKind::Chg));

    // Drain the rest of the burst; nothing may mention the png.
    while let Some((path, _)) = next_edit_quick(&mut rx).await {
        assert_eq!(path, "css/site.less");
    }

    std::fs::remove_file(src.join("css/site.less")).unwrap();
    let mut saw_delete = false;
    while let Some((path, kind)) = next_edit(&mut rx).await {
        assert_eq!(path, "css/site.less");
        if kind == EditKind::Del {
            saw_delete = true;
            break;
        }
    }
    assert!(saw_delete);
}

async fn next_edit_quick(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Option<(String, EditKind)> {
    match timeout(Duration::from_millis(200), rx.recv()).await {
        Ok(Some(RuntimeEvent::FileEdited { path, kind })) => Some((path, kind)),
        _ => None,
    }
}

#[tokio::test]
async fn touching_a_processed_file_is_reported_as_a_change() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("style.less"), "a { }").unwrap();

    let matcher = Arc::new(RuleMatcher::from_specs(&default_rules()).unwrap());
    let (tx, mut rx) = mpsc::channel(64);
    let _handle = spawn_watcher(&src, matcher, tx).unwrap();
    sleep(Duration::from_millis(100)).await;

    // Same bytes, newer mtime.
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(src.join("style.less"))
        .unwrap();
    file.set_modified(std::time::SystemTime::now() + Duration::from_secs(5))
        .unwrap();
    drop(file);

    let (path, kind) = next_edit(&mut rx).await.expect("edit for touched file");
    assert_eq!(path, "style.less");
    assert_eq!(kind, EditKind::Chg);
}
