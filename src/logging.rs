//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing`; report lines go to the
//! [crate::sink::Writer] and never through here.
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::errors::TrellisError;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warn
    }
}

impl FromStr for LogLevel {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(TrellisError::Config {
                path: "--log-level".into(),
                msg: format!("unknown log level `{}`", other),
            }),
        }
    }
}

/// Directive used when none is given explicitly.
pub fn default_directive(level: LogLevel) -> String {
    format!("trellis={}", level.to_tracing_level())
}

/// Initialize the logger. A `directive` (e.g. from `TRELLIS_LOG`) replaces
/// the level-based default filter.
pub fn init_logger(level: LogLevel, directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::new(default_directive(level)),
    };

    // A subscriber may already be installed, e.g. by an embedding test.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
