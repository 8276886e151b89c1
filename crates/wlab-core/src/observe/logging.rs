//! # Structured Logging
//!
//! Structured logging via the `tracing` ecosystem:
//!
//! - Multiple output formats (JSON, Pretty, Compact)
//! - Log level filtering, overridable through `RUST_LOG`
//! - Per-module filter directives
//!
//! ## Example
//!
//! ```rust,ignore
//! use wlab_core::observe::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//!
//! init_logging(&config);
//!
//! tracing::info!(channels = 6, "Solve complete");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (every bisection step)
    Trace,
    Debug,
    /// Info level (default)
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    /// Map a `-v` repetition count onto a level, starting from `Warn`.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    Json,
    /// Pretty format (human-readable, multi-line)
    Pretty,
    /// Compact format (one line per event)
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Compact
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include source location (file:line)
    pub source_location: bool,
    /// Include the event target (module path)
    pub target: bool,
    /// Include span enter/exit events
    pub span_events: bool,
    /// Filter directives (e.g., "wlab_core=trace,wlab_sim=debug")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            source_location: false,
            target: false,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose, human-readable configuration.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            source_location: true,
            target: true,
            span_events: true,
            ..Default::default()
        }
    }

    /// JSON configuration for machine consumption.
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            target: true,
            ..Default::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            ..Default::default()
        }
    }

    /// Copy of this configuration at a different level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Filter directives this configuration resolves to.
    ///
    /// An explicit `filter` wins; otherwise `RUST_LOG` is consulted, then the
    /// configured level applies.
    pub fn env_filter(&self) -> EnvFilter {
        if let Some(ref custom) = self.filter {
            EnvFilter::try_new(custom).unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
        }
    }
}

/// Initialize the global logging subscriber.
///
/// Call once at startup. Later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = config.env_filter();

    let span_events = if config.span_events {
        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    };

    // Logs go to stderr so stdout stays clean for results
    let result = match config.format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.target)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_span_events(span_events),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(config.target)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_span_events(span_events),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(config.target)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_span_events(span_events),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    // Already initialised elsewhere (tests, embedding application)
    let _ = result;
}
