// src/engine/runtime.rs

use std::fmt;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::PassExecutor;
use crate::watch::WatcherHandle;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Feeds `RuntimeEvent`s into the [`CoreRuntime`], owns the debounce timer,
/// and hands passes to a [`PassExecutor`].
///
/// This is a pure IO shell: every decision is made by the core.
pub struct Runtime<E: PassExecutor> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    /// Deadline and generation of the armed debounce timer.
    timer: Option<(Instant, u64)>,
    /// Dropped on `StopWatching`.
    watcher: Option<WatcherHandle>,
}

impl<E: PassExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("timer", &self.timer)
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: PassExecutor> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            timer: None,
            watcher: None,
        }
    }

    /// Hand the watcher to the runtime so shutdown can close it before the
    /// in-flight pass drains.
    pub fn with_watcher(mut self, watcher: WatcherHandle) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Main event loop. Returns once the core asks to exit or every event
    /// sender is gone; fails if a pass was aborted by a fatal error.
    pub async fn run(mut self) -> Result<()> {
        info!("assetflow watch runtime started");

        loop {
            let event = tokio::select! {
                received = self.event_rx.recv() => match received {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                generation = wait_for(self.timer) => {
                    self.timer = None;
                    RuntimeEvent::DebounceElapsed { generation }
                }
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        if let Some(error) = self.core.take_abort() {
            return Err(anyhow!("incremental pass aborted: {error}").into());
        }
        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::ArmTimer { generation, delay } => {
                self.timer = Some((Instant::now() + delay, generation));
            }
            CoreCommand::StartPass(edits) => {
                debug!(files = edits.len(), "starting incremental pass");
                self.executor.start_pass(edits).await?;
            }
            CoreCommand::StopWatching => {
                if self.watcher.take().is_some() {
                    info!("file watcher closed");
                }
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}

/// Resolve with the timer's generation once it fires; never resolve when
/// no timer is armed.
async fn wait_for(timer: Option<(Instant, u64)>) -> u64 {
    match timer {
        Some((deadline, generation)) => {
            sleep_until(deadline).await;
            generation
        }
        None => std::future::pending().await,
    }
}
