// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Provide the built-in rule set (`defaults.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and normalise rules (`validate.rs`).

pub mod defaults;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::default_rules;
pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig, RuleSpec, RuleTargets, StringOrList};
