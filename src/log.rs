use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::prelude::*;

/// Where and how verbosely to log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub path: PathBuf,
    /// Filter used when RUST_LOG is not set
    pub level: String,
}

/// Keeps the log writer alive; pending lines are flushed when dropped.
#[must_use = "dropping the guard stops the log writer"]
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Builds the JSON file subscriber without installing it.
pub fn build(config: &LogConfig) -> anyhow::Result<(Dispatch, LogGuard)> {
    if let Some(parent) = config.path.parent() {
        std::fs::create_dir_all(parent).inspect_err(|e| {
            eprintln!("Failed to create log directory {:?}: {}", parent, e);
        })?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.path)
        .inspect_err(|e| {
            eprintln!("Failed to open log file {:?}: {}", config.path, e);
        })?;

    // One writer thread owns the file, so lines never interleave
    let (writer, worker) = tracing_appender::non_blocking(log_file);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .fmt_fields(JsonFields::default());

    // Use RUST_LOG if set, otherwise the configured level
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(json_layer);
    Ok((Dispatch::new(subscriber), LogGuard { _worker: worker }))
}

/// Installs the process-wide subscriber. Keep the guard until shutdown.
pub fn init(config: &LogConfig) -> anyhow::Result<LogGuard> {
    let (dispatch, guard) = build(config)?;
    tracing::dispatcher::set_global_default(dispatch)?;
    Ok(guard)
}
