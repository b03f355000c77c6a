// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::build::RuleMatcher;
use crate::engine::RuntimeEvent;
use crate::watch::cache::ContentCache;
use crate::watch::event_handler::process_file_change;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `source_dir` recursively and send `RuntimeEvent::FileEdited` for
/// every edit to a file some processing rule owns.
pub fn spawn_watcher(
    source_dir: impl Into<PathBuf>,
    matcher: Arc<RuleMatcher>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let source_dir = source_dir.into();
    let source_dir = source_dir.canonicalize().unwrap_or(source_dir);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetflow: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetflow: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&source_dir, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", source_dir);

    tokio::spawn(async move {
        let mut cache = ContentCache::new();
        'events: while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            for path in event.paths.iter() {
                let open =
                    process_file_change(&source_dir, path, &event.kind, &matcher, &mut cache, &runtime_tx)
                        .await;
                if !open {
                    warn!("runtime channel closed; stopping watcher loop");
                    break 'events;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
