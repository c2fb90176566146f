//! Tracing subscriber setup: stderr in the chosen format plus a plain log file

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::LogFormat;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level`. The returned guard flushes the file writer
/// on drop and must live until the process exits.
pub fn init_logging(level: &str, format: LogFormat, log_file: &Path) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {}", level))?;

    let (dir, file_name) = split_log_file(log_file)?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, file_name));

    let stderr_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
    };
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn split_log_file(log_file: &Path) -> Result<(std::path::PathBuf, std::ffi::OsString)> {
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", log_file.display()))?
        .to_os_string();
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    Ok((dir, file_name))
}
