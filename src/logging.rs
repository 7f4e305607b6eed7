//! Structured logging configuration for the runbridge daemon.
//!
//! Provides pretty, JSON, or compact output, compatible with log
//! aggregation systems when JSON is selected.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Logging format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Pretty human-readable output (default for development)
    #[default]
    Pretty,
    /// JSON output for log aggregation
    Json,
    /// Compact single-line output
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (pretty, json, compact)
    pub format: LogFormat,
    /// Minimum log level
    pub level: Level,
    /// Include span events (enter/exit)
    pub with_spans: bool,
    /// Include target (module path)
    pub with_target: bool,
    /// Include file name and line number
    pub with_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: Level::INFO,
            with_spans: false,
            with_target: true,
            with_file: false,
        }
    }
}

impl LogConfig {
    /// Set the log level.
    #[must_use]
    pub const fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the log format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Should be called once at startup. Respects `RUST_LOG` environment
/// variable for filtering if set.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(config.with_target)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_span_events(span_events),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        },
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_span_events(span_events)
                    .with_writer(io::stdout),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        },
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(config.with_target)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_span_events(span_events),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        },
    }
}

/// Log a completed request with timing.
pub fn log_request_complete(method: &str, path: &str, status: u16, duration_ms: u64) {
    tracing::debug!(
        method = %method,
        path = %path,
        status = status,
        duration_ms = duration_ms,
        "Request completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(matches!(config.format, LogFormat::Pretty));
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::default()
            .level(Level::DEBUG)
            .format(LogFormat::Compact);

        assert_eq!(config.level, Level::DEBUG);
        assert!(matches!(config.format, LogFormat::Compact));
    }
}
