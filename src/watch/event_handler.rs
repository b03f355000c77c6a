// src/watch/event_handler.rs

//! Turns raw notify events into `RuntimeEvent::FileEdited`.

use std::path::Path;

use notify::EventKind;
use notify::event::{AccessKind, AccessMode, MetadataKind, ModifyKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::build::RuleMatcher;
use crate::engine::RuntimeEvent;
use crate::fs::path_utils::relative_str;
use crate::types::EditKind;
use crate::watch::cache::ContentCache;

/// Map a notify event kind to an edit.
///
/// Renames are reported per path, so the edit depends on whether the path
/// exists afterwards. A touch shows up as a write-time (or unspecified)
/// metadata change and a close after writing; both count as CHG. Reads and
/// other metadata changes are not edits.
pub fn classify(kind: &EventKind, exists: bool) -> Option<EditKind> {
    match kind {
        EventKind::Create(_) => Some(EditKind::Add),
        EventKind::Remove(_) => Some(EditKind::Del),
        EventKind::Modify(ModifyKind::Name(_)) => Some(if exists { EditKind::Add } else { EditKind::Del }),
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime | MetadataKind::Any)) => {
            Some(EditKind::Chg)
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(EditKind::Chg),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(EditKind::Chg),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Handle one path of a notify event.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    source_dir: &Path,
    path: &Path,
    kind: &EventKind,
    matcher: &RuleMatcher,
    cache: &mut ContentCache,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    if path.is_dir() {
        return true;
    }
    let Some(edit) = classify(kind, path.exists()) else {
        return true;
    };

    let Some(rel) = relative_str(source_dir, path) else {
        debug!(?path, "event outside the source dir");
        return true;
    };
    if matcher.should_ignore(&rel) {
        debug!(file = %rel, "no processing rule; ignoring");
        return true;
    }

    match edit {
        EditKind::Del => cache.forget(path),
        EditKind::Add | EditKind::Chg => match cache.refresh(path) {
            Ok(false) if edit == EditKind::Chg => return true,
            Ok(_) => {}
            Err(err) => debug!(?path, error = %err, "could not hash edited file"),
        },
    }

    debug!(file = %rel, %edit, "queueing edit");
    if let Err(err) = runtime_tx
        .send(RuntimeEvent::FileEdited { path: rel, kind: edit })
        .await
    {
        warn!("failed to send RuntimeEvent::FileEdited: {err}");
        return false;
    }
    true
}
