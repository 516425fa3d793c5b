//! Tracing setup.
//!
//! `CLIENTDESK_LOG` takes precedence over `[log] level`. Output goes to
//! stderr so it never mixes with command output on stdout.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{Config, paths};

pub const LOG_ENV: &str = "CLIENTDESK_LOG";
const LOG_FILE_PREFIX: &str = "clientdesk.log";

/// Builds the filter from `CLIENTDESK_LOG`, falling back to the configured level.
fn build_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; keep it
/// alive until the process exits or buffered lines are lost.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(build_filter(config));

    if !config.log.file {
        tracing_subscriber::registry()
            .with(stderr_layer)
            .try_init()
            .context("install tracing subscriber")?;
        return Ok(None);
    }

    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(build_filter(config));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_is_used() {
        let mut config = Config::default();
        config.log.level = "clientdesk_core=debug".to_string();
        assert_eq!(build_filter(&config).to_string(), "clientdesk_core=debug");
    }

    #[test]
    fn test_invalid_level_falls_back_to_warn() {
        let mut config = Config::default();
        config.log.level = "clientdesk_core=loud".to_string();
        assert_eq!(build_filter(&config).to_string(), "warn");
    }
}
