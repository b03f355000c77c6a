// src/exec/mod.rs

//! Pass execution layer.
//!
//! [`backend`] provides the `PassExecutor` trait and the
//! `BuilderPassExecutor` the runtime uses in production, and which tests
//! can replace with a fake implementation.

pub mod backend;

pub use backend::{BuilderPassExecutor, PassExecutor};
