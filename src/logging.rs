//! Logging setup for picvault.
//!
//! Events go to the console and are appended to the configured log file.
//! `RUST_LOG` takes precedence over the configured level when set.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{PicvaultError, Result};

/// Parse a configured level name. Returns `None` for unknown names.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Filter directives used when `RUST_LOG` is not set.
///
/// The crate logs at the configured level; dependencies only at `warn`.
fn default_directives(level: &str) -> String {
    let level = parse_level(level).unwrap_or(Level::INFO);
    format!("warn,picvault={}", level.as_str().to_ascii_lowercase())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Open the log file for appending, creating parent directories as needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialize console and file logging.
///
/// Fails if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = Arc::new(open_log_file(Path::new(&config.file))?);

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .with(
            fmt::layer()
                .with_writer(log_file)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| PicvaultError::Config(format!("failed to install logger: {e}")))
}

/// Initialize console-only logging. A no-op if a subscriber is already set.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(std::io::stdout))
        .try_init();
}
