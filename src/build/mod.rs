// src/build/mod.rs

//! The build engine.
//!
//! - [`rule`]: rule matching (last match wins).
//! - [`graph`]: target/source dependency maps and imported-target detection.
//! - [`context`] / [`state`]: per-stage and per-rule bookkeeping, including
//!   the incremental recompile decisions.
//! - [`finalizer`]: copy / merge of final outputs into the target dir.
//! - [`builder`]: full and incremental passes over all rules.

pub mod builder;
pub mod context;
pub mod finalizer;
pub mod graph;
pub mod rule;
pub mod state;
pub mod task;

pub use builder::{BuildReport, Builder, RuleReport};
pub use context::{
    Context, LastOutput, ProcessorFailure, ProcessorInput, ProcessorInputEntry, ProcessorOutput,
    ProcessorOutputEntry,
};
pub use finalizer::{FinalizeReport, FinalizeStep, Finalizer};
pub use graph::DependencyMap;
pub use rule::{Rule, RuleMatcher};
pub use state::{BuildDirs, IncrementalBuildState, ModeState, RuleState};
pub use task::Task;
