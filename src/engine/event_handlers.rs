// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Duration;

use tracing::{debug, info};

use crate::engine::edit_queue::EditQueues;
use crate::types::{BuildStatus, EditKind};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// (Re)start the debounce timer. Only the latest generation counts.
    ArmTimer { generation: u64, delay: Duration },
    /// Run one incremental pass over these net edits.
    StartPass(Vec<(String, EditKind)>),
    /// Close the file watcher; no further edits are accepted.
    StopWatching,
    /// Stop the process.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub fn run(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub fn exit() -> Self {
        Self {
            commands: vec![CoreCommand::RequestExit],
            keep_running: false,
        }
    }
}

/// Mutable state the handlers work on.
#[derive(Debug, Default)]
pub struct PassGate {
    pub generation: u64,
    /// A pass is running; new passes wait for it.
    pub in_flight: bool,
    /// The debounce timer fired while a pass was running.
    pub pending: bool,
    pub shutting_down: bool,
    pub aborted: Option<String>,
}

/// Queue the edit and restart the debounce timer.
pub fn handle_file_edit(
    gate: &mut PassGate,
    queues: &mut EditQueues,
    delay: Duration,
    path: String,
    kind: EditKind,
) -> CoreStep {
    if gate.shutting_down {
        debug!(path, %kind, "shutting down; edit dropped");
        return CoreStep::idle();
    }
    queues.push(path, kind);
    gate.generation += 1;
    CoreStep::run(vec![CoreCommand::ArmTimer {
        generation: gate.generation,
        delay,
    }])
}

/// The source tree has been quiet for the debounce delay.
pub fn handle_debounce(gate: &mut PassGate, queues: &mut EditQueues, generation: u64) -> CoreStep {
    if generation != gate.generation || gate.shutting_down {
        return CoreStep::idle();
    }
    if gate.in_flight {
        debug!("pass in flight; deferring");
        gate.pending = true;
        return CoreStep::idle();
    }
    start_pass(gate, queues)
}

pub fn handle_pass_completed(
    gate: &mut PassGate,
    queues: &mut EditQueues,
    status: BuildStatus,
) -> CoreStep {
    gate.in_flight = false;
    debug!(?status, "pass completed");

    if gate.shutting_down {
        info!("in-flight pass finished; exiting");
        return CoreStep::exit();
    }
    if std::mem::take(&mut gate.pending) {
        return start_pass(gate, queues);
    }
    CoreStep::idle()
}

/// A pass hit a fatal error; stop after recording it.
pub fn handle_pass_aborted(gate: &mut PassGate, error: String) -> CoreStep {
    gate.in_flight = false;
    gate.aborted = Some(error);
    CoreStep::exit()
}

/// Close the watcher, then exit now or once the in-flight pass has finished.
pub fn handle_shutdown(gate: &mut PassGate) -> CoreStep {
    gate.shutting_down = true;
    if gate.in_flight {
        info!("waiting for in-flight pass before exiting");
        return CoreStep::run(vec![CoreCommand::StopWatching]);
    }
    CoreStep {
        commands: vec![CoreCommand::StopWatching, CoreCommand::RequestExit],
        keep_running: false,
    }
}

fn start_pass(gate: &mut PassGate, queues: &mut EditQueues) -> CoreStep {
    let edits = queues.take();
    if edits.is_empty() {
        debug!("edits cancelled out; nothing to build");
        return CoreStep::idle();
    }
    gate.in_flight = true;
    CoreStep::run(vec![CoreCommand::StartPass(edits)])
}
