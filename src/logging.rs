// src/logging.rs

//! Logging setup for `assetflow` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ASSETFLOW_LOG` environment variable, in `EnvFilter` syntax
//!    (e.g. "debug" or "assetflow::build=trace,info")
//! 3. default to `info`
//!
//! Logs are sent to STDERR; stdout carries only the build status lines.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ASSETFLOW_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_str());
    }
    env_value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    fn max(filter: EnvFilter) -> Option<LevelFilter> {
        filter.max_level_hint()
    }

    #[test]
    fn cli_level_wins_over_env() {
        assert_eq!(max(build_filter(Some(LogLevel::Warn), Some("trace"))), Some(LevelFilter::WARN));
    }

    #[test]
    fn env_then_default() {
        assert_eq!(max(build_filter(None, Some("debug"))), Some(LevelFilter::DEBUG));
        assert_eq!(max(build_filter(None, Some("  "))), Some(LevelFilter::INFO));
        assert_eq!(max(build_filter(None, None)), Some(LevelFilter::INFO));
    }
}
