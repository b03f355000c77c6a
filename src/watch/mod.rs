// src/watch/mod.rs

//! File watching for watch mode.
//!
//! Wires up a cross-platform filesystem watcher (`notify`) on the source
//! dir and turns its events into per-file edits for the engine. Files no
//! processing rule owns are filtered out here, as are changes that leave a
//! file's content as it was.

pub mod cache;
pub mod event_handler;
pub mod watcher;

pub use cache::ContentCache;
pub use watcher::{WatcherHandle, spawn_watcher};
