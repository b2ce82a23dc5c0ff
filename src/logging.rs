//! Process-wide `tracing` setup for the `engrave` binary
//!
//! Events go to stderr, so an `encode` piped into another tool only carries
//! the SVG on stdout. A log file can be added on top; it receives the same
//! events without colors.

use crate::config::LoggingOptions;
use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that overrides [`LoggingOptions::level`]
pub const LEVEL_ENV: &str = "ENGRAVE_LOG_LEVEL";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber described by `options`.
///
/// Does nothing when a subscriber is already installed.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = level_filter(std::env::var(LEVEL_ENV).ok().as_deref(), options)?;
    let log_file = options.file.as_deref().map(file_writer).transpose()?;

    let console = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .with_ansi(options.color);
    let file = log_file.map(|writer| {
        fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(writer)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Build the level filter; a non-empty `env_level` wins over the configured level.
fn level_filter(env_level: Option<&str>, options: &LoggingOptions) -> Result<EnvFilter> {
    let level = env_level
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&options.level);
    EnvFilter::try_new(level).map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))
}

/// Open `path` for appending behind a background writer thread.
fn file_writer(path: &Path) -> Result<NonBlocking> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            Error::Config(format!("Failed to create log directory {}: {e}", dir.display()))
        })?;
    }
    let file: File = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Config(format!("Failed to open log file {}: {e}", path.display())))?;

    let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);
    // Flushes pending lines when the process exits.
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
