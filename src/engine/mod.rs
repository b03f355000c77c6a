// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! Watcher events are buffered per file in [`edit_queue`]; a debounce timer
//! turns a quiet source tree into one incremental pass, and at most one pass
//! runs at a time.
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::types::{BuildStatus, EditKind};

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Quiet period after the last edit before a pass starts.
    pub debounce: Duration,
}

/// Events flowing into the runtime from the watcher, the pass executor and
/// signal handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A source file changed. `path` is relative to the source dir.
    FileEdited { path: String, kind: EditKind },
    /// The debounce timer armed for `generation` fired.
    DebounceElapsed { generation: u64 },
    /// An incremental pass finished (possibly with per-file failures).
    PassCompleted { status: BuildStatus },
    /// An incremental pass hit a fatal error.
    PassAborted { error: String },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod edit_queue;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use edit_queue::{EditQueue, EditQueues};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
