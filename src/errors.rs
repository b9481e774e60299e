use std::{io, path::PathBuf};
use thiserror::Error;

/// An error from Trellis.
///
/// Failures raised by test logic never show up here; they are recorded in the
/// result tree instead. These are the errors that stop a run before it starts.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse {}: {msg}", path.display())]
    Config { path: PathBuf, msg: String },

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Cannot connect to {host}:{port}. Start network service or disable network option. {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Discovery(String),
}

impl TrellisError {
    /// Construct a discovery error from anything printable.
    pub fn discovery(msg: impl Into<String>) -> Self {
        TrellisError::Discovery(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_names_target() {
        let err = TrellisError::Connect {
            host: "10.0.0.2".to_string(),
            port: 16384,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.2:16384"));
        assert!(msg.contains("refused"));
    }
}
