//! Shared helpers and error types for MasteryOS.

use thiserror::Error;

pub mod logging;

/// Result type for shared helpers.
pub type UtilsResult<T> = Result<T, UtilsError>;

/// Shared error variants for cross-crate helpers.
#[derive(Debug, Error)]
pub enum UtilsError {
    /// An IO error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A log level string was not recognized.
    #[error("unsupported log level `{0}`; expected trace|debug|info|warn|error")]
    LogLevel(String),
    /// The logger could not be started or was already started differently.
    #[error("logging error: {0}")]
    Logging(String),
}

/// Collapse line breaks and cap length so user text stays on one log line.
pub fn sanitize_for_log(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
