// tests/config_errors.rs

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use assetflow::build::Builder;
use assetflow::config::load_and_validate;
use assetflow::errors::AssetflowError;
use assetflow::fs::RealFileSystem;
use assetflow::processors::ProcessorRegistry;
use assetflow::types::BuildMode;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn malformed_toml_returns_toml_error() {
    let file = config_file("[[rule]\nsources = ");
    match load_and_validate(file.path()) {
        Err(AssetflowError::TomlError(_)) => {}
        other => panic!("Expected TomlError, got: {:?}", other),
    }
}

#[test]
fn invalid_glob_returns_config_error() {
    let file = config_file(
        r#"
[[rule]]
sources = ["css/[unclosed"]
"#,
    );
    match load_and_validate(file.path()) {
        Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("css/[unclosed")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_debounce_returns_config_error() {
    let file = config_file("[config]\ndebounce_ms = 0\n");
    match load_and_validate(file.path()) {
        Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("debounce_ms")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unknown_processor_is_fatal_at_builder_construction() {
    let file = config_file(
        r#"
[[rule]]
sources = "**/*.ts"
processors = ["tsc"]
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();
    let err = Builder::new(
        &cfg,
        &ProcessorRegistry::with_builtins().unwrap(),
        Arc::new(RealFileSystem),
        BuildMode::Full,
    )
    .unwrap_err();

    match err {
        AssetflowError::UnknownProcessor { rule, name } => {
            assert_eq!(name, "tsc");
            // Built-in rules come first.
            assert_eq!(rule, cfg.rules.len() - 1);
        }
        other => panic!("Expected UnknownProcessor, got: {:?}", other),
    }
}

#[test]
fn directories_resolve_against_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Assetflow.toml");
    std::fs::write(&path, "[config]\nsource_dir = \"assets\"\ntarget_dir = \"dist\"\n").unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.source_dir(), dir.path().join("assets"));
    assert_eq!(cfg.target_dir(), dir.path().join("dist"));
    assert_eq!(cfg.work_dir(), dir.path().join(".assetflow"));
}
