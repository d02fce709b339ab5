//! Logging setup: daily rotated text and JSON files plus a compact terminal layer.
//!
//! Progress of the long narrowing passes is mostly read from the files, so
//! every layer shares one filter: `RUST_LOG` when set, otherwise the level
//! given on the command line.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Flushes the background log writers when dropped; keep it alive in `main`.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _text: WorkerGuard,
    _json: WorkerGuard,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Cannot create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Logging already initialised: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter used by every layer
pub fn build_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_level)?),
    }
}

/// Install the global subscriber.
///
/// Writes `member_since.log` (text) and `member_since.json.log` (JSON) under
/// `log_dir`, rotated daily, and mirrors events to stdout.
pub fn init_logging<P: AsRef<Path>>(log_dir: P, default_level: &str) -> Result<LogGuard, LoggingError> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let env_filter = build_filter(default_level)?;

    let (text_writer, text_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_path, "member_since.log"));
    let (json_writer, json_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_path, "member_since.json.log"));

    let text_layer = fmt::layer()
        .with_writer(text_writer)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter.clone());

    let json_layer = fmt::layer()
        .json()
        .with_writer(json_writer)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(env_filter.clone());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(stdout_layer)
        .try_init()?;

    tracing::debug!("Text logs: {}/member_since.log", log_path.display());
    tracing::debug!("JSON logs: {}/member_since.json.log", log_path.display());

    Ok(LogGuard {
        _text: text_guard,
        _json: json_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("debug").is_ok());
        }
    }

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");

        // Another test may have installed the global subscriber already
        let result = init_logging(&log_dir, "info");
        assert!(log_dir.exists());
        assert!(matches!(result, Ok(_) | Err(LoggingError::Init(_))));
    }
}
