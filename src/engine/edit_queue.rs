// src/engine/edit_queue.rs

//! Per-file buffers of watcher events, reduced to one net edit per pass.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::EditKind;

/// Events seen for one file since the last pass, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditQueue {
    events: Vec<EditKind>,
}

impl EditQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: EditKind) {
        self.events.push(kind);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Net effect of the queued events, or `None` if they cancel out.
    pub fn reduce(&self, file: &str) -> Option<EditKind> {
        self.events
            .iter()
            .fold(None, |net, &next| combine(file, net, next))
    }
}

/// Fold `next` into the net edit accumulated so far.
fn combine(file: &str, net: Option<EditKind>, next: EditKind) -> Option<EditKind> {
    use EditKind::*;

    let Some(prev) = net else {
        return Some(next);
    };
    match (prev, next) {
        (a, b) if a == b => Some(a),
        (Add, Chg) => Some(Add),
        (Chg, Del) => Some(Del),
        (Add, Del) | (Del, Add) => None,
        (prev, next) => {
            warn!(file, from = %prev, to = %next, "unexpected edit sequence; keeping earlier edit");
            Some(prev)
        }
    }
}

/// Queues for every file touched since the last pass.
#[derive(Debug, Clone, Default)]
pub struct EditQueues {
    queues: BTreeMap<String, EditQueue>,
}

impl EditQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: impl Into<String>, kind: EditKind) {
        self.queues.entry(file.into()).or_default().push(kind);
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of files with pending events.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Drain every queue and return the net edits, sorted by file. Files
    /// whose events cancel out are dropped.
    pub fn take(&mut self) -> Vec<(String, EditKind)> {
        std::mem::take(&mut self.queues)
            .into_iter()
            .filter_map(|(file, queue)| queue.reduce(&file).map(|kind| (file, kind)))
            .collect()
    }
}
