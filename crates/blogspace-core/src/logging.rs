//! File logging.
//!
//! Diagnostics go to `$BLOGSPACE_HOME/logs/blogspace.log` so they never mix
//! with command output on stdout/stderr.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{Config, paths};

/// Filter override checked before `RUST_LOG`.
pub const LOG_ENV: &str = "BLOGSPACE_LOG";
const LOG_FILE: &str = "blogspace.log";

/// Resolves the filter: `BLOGSPACE_LOG`, then `RUST_LOG`, then the config.
fn filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    fmt()
        .with_env_filter(filter(config))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(guard)
}
