// src/build/task.rs

use std::collections::BTreeSet;

use crate::types::EditKind;

/// Net edits for one rule in one incremental pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub changed: BTreeSet<String>,
}

impl Task {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: EditKind, file: impl Into<String>) {
        let file = file.into();
        match kind {
            EditKind::Add => self.added.insert(file),
            EditKind::Del => self.deleted.insert(file),
            EditKind::Chg => self.changed.insert(file),
        };
    }

    /// Every affected file regardless of kind.
    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.added
            .iter()
            .chain(self.deleted.iter())
            .chain(self.changed.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.changed.len()
    }
}
