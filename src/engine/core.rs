// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and returns the commands the IO shell should
//! run: arm the debounce timer, start an incremental pass, exit. It owns the
//! per-file edit queues and the single-pass gate, and never touches Tokio or
//! the filesystem, so watch-mode semantics are unit tested here.

use crate::engine::edit_queue::EditQueues;
use crate::engine::event_handlers::{
    CoreStep, PassGate, handle_debounce, handle_file_edit, handle_pass_aborted,
    handle_pass_completed, handle_shutdown,
};
use crate::engine::{RuntimeEvent, RuntimeOptions};

#[derive(Debug)]
pub struct CoreRuntime {
    queues: EditQueues,
    gate: PassGate,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            queues: EditQueues::new(),
            gate: PassGate::default(),
            options,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.gate.in_flight
    }

    /// Files with buffered edits not yet handed to a pass.
    pub fn pending_files(&self) -> usize {
        self.queues.len()
    }

    /// Error of the pass that stopped the runtime, if any.
    pub fn take_abort(&mut self) -> Option<String> {
        self.gate.aborted.take()
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::FileEdited { path, kind } => handle_file_edit(
                &mut self.gate,
                &mut self.queues,
                self.options.debounce,
                path,
                kind,
            ),
            RuntimeEvent::DebounceElapsed { generation } => {
                handle_debounce(&mut self.gate, &mut self.queues, generation)
            }
            RuntimeEvent::PassCompleted { status } => {
                handle_pass_completed(&mut self.gate, &mut self.queues, status)
            }
            RuntimeEvent::PassAborted { error } => handle_pass_aborted(&mut self.gate, error),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.gate),
        }
    }
}
