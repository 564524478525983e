// src/logging.rs

//! Logging: a `tracing-subscriber` fmt layer on stderr.
//!
//! The filter comes from `--log-level` when given, otherwise from
//! `SITEFLOW_LOG` (full `EnvFilter` syntax, e.g. `siteflow::watch=debug`),
//! otherwise `info`. Stdout is left to the build summary.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is passed.
pub const LOG_ENV: &str = "SITEFLOW_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(e) => {
            if std::env::var_os(LOG_ENV).is_some() {
                eprintln!("siteflow: ignoring invalid {LOG_ENV}: {e}");
            }
            EnvFilter::new("info")
        }
    }
}
