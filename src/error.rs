//! Error handling for the Pi metrics logger.

use crate::metrics::source::SourceKind;
use std::path::PathBuf;

/// A specialized `Result` type for logger operations.
pub type Result<T> = std::result::Result<T, SystemError>;

/// The main error type for logger operations.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Pseudo-file contents could not be parsed
    #[error("Failed to parse system information: {0}")]
    ParseError(String),

    /// A metric source could not be opened or parsed
    #[error("Source {kind} unavailable: {reason}")]
    SourceUnavailable {
        kind: SourceKind,
        reason: String,
    },

    /// The log file could not be opened for writing
    #[error("Cannot open log file {}: {reason}", path.display())]
    SinkUnavailable { path: PathBuf, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic system error
    #[error("System error: {0}")]
    System(String),
}

impl SystemError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a new source-unavailable error
    pub fn source_unavailable(kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a new sink-unavailable error
    pub fn sink_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SinkUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new generic system error
    #[allow(clippy::self_named_constructors)]
    pub fn system_error(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Whether this error came from the log sink.
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Self::SinkUnavailable { .. })
    }
}
