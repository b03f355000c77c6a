// src/exec/backend.rs

//! Pluggable pass executor abstraction.
//!
//! The runtime talks to a `PassExecutor` instead of the builder directly.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production implementation, [`BuilderPassExecutor`], here.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{error, warn};

use crate::build::Builder;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::types::{BuildStatus, EditKind};

/// Runs incremental passes on behalf of the runtime.
///
/// `start_pass` must not wait for the pass itself: the runtime keeps
/// buffering watcher events meanwhile. Implementations report the end of the
/// pass with `RuntimeEvent::PassCompleted` (or `PassAborted`).
pub trait PassExecutor: Send {
    fn start_pass(
        &mut self,
        edits: Vec<(String, EditKind)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production executor: runs [`Builder::incremental`] on a background task
/// and prints the pass status line.
pub struct BuilderPassExecutor {
    builder: Arc<Mutex<Builder>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl BuilderPassExecutor {
    pub fn new(builder: Arc<Mutex<Builder>>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            builder,
            runtime_tx,
        }
    }
}

impl PassExecutor for BuilderPassExecutor {
    fn start_pass(
        &mut self,
        edits: Vec<(String, EditKind)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let builder = self.builder.clone();
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let event = run_pass(&builder, &edits).await;
                if tx.send(event).await.is_err() {
                    warn!("runtime gone before pass completion was reported");
                }
            });
            Ok(())
        })
    }
}

async fn run_pass(builder: &Mutex<Builder>, edits: &[(String, EditKind)]) -> RuntimeEvent {
    let mut builder = builder.lock().await;
    match builder.incremental(edits).await {
        Ok(report) => {
            for failure in report.failures() {
                eprintln!("[assetflow] {failure}");
            }
            println!("[assetflow] incremental {}", report.status.incremental_label());
            RuntimeEvent::PassCompleted {
                status: report.status,
            }
        }
        Err(err) => {
            error!(error = %err, "incremental pass aborted");
            println!(
                "[assetflow] incremental {}",
                BuildStatus::Failed.incremental_label()
            );
            RuntimeEvent::PassAborted {
                error: err.to_string(),
            }
        }
    }
}
