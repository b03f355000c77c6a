use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetflow::engine::RuntimeEvent;
use assetflow::errors::Result;
use assetflow::exec::PassExecutor;
use assetflow::types::{BuildStatus, EditKind};
use tokio::sync::mpsc;

/// Edit batches handed to a [`FakePassExecutor`], one per pass.
pub type PassLog = Arc<Mutex<Vec<Vec<(String, EditKind)>>>>;

/// A fake pass executor that:
/// - records the net edits of every pass
/// - reports `PassCompleted` with a fixed status right away, unless it is
///   holding passes open (the test then reports completion itself).
pub struct FakePassExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    passes: PassLog,
    status: BuildStatus,
    report: bool,
}

impl FakePassExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, passes: PassLog) -> Self {
        Self {
            runtime_tx,
            passes,
            status: BuildStatus::Success,
            report: true,
        }
    }

    /// Never report completion; passes stay in flight.
    pub fn holding(mut self) -> Self {
        self.report = false;
        self
    }

    pub fn with_status(mut self, status: BuildStatus) -> Self {
        self.status = status;
        self
    }
}

impl PassExecutor for FakePassExecutor {
    fn start_pass(
        &mut self,
        edits: Vec<(String, EditKind)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let passes = Arc::clone(&self.passes);
        let status = self.status;
        let report = self.report;

        Box::pin(async move {
            passes.lock().unwrap().push(edits);
            if !report {
                return Ok(());
            }
            tx.send(RuntimeEvent::PassCompleted { status })
                .await
                .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
