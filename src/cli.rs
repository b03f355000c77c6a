// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Incremental build pipeline for static web assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Relative `[config]` directories are resolved against this file's
    /// directory.
    #[arg(long, value_name = "PATH", default_value = "Assetflow.toml")]
    pub config: String,

    /// Run one full build and exit instead of watching for changes.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print rules with their matched files, but
    /// don't process anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch_mode_with_standard_config() {
        let args = CliArgs::try_parse_from(["assetflow"]).unwrap();
        assert_eq!(args.config, "Assetflow.toml");
        assert!(!args.once);
        assert!(!args.dry_run);
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "assetflow",
            "--config",
            "site/Assetflow.toml",
            "--once",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.config, "site/Assetflow.toml");
        assert!(args.once);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }
}
