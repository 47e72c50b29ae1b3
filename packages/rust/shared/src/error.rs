//! Error types for docfetch.
//!
//! Library crates use [`DocFetchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all docfetch operations.
#[derive(Debug, thiserror::Error)]
pub enum DocFetchError {
    /// No URLs were supplied at all.
    #[error("URLs list cannot be empty")]
    EmptyInput,

    /// Every supplied URL failed validation.
    #[error("No valid URLs provided")]
    NoValidUrls { invalid: Vec<String> },

    /// Network/HTTP error while fetching a URL.
    #[error("network error: {0}")]
    Network(String),

    /// The conversion step exceeded its time budget.
    #[error("timed out after {}s fetching {url}", after.as_secs_f64())]
    Timeout { url: String, after: Duration },

    /// The remote resource has a content type we cannot convert.
    #[error("unsupported content type '{content_type}' for {url}")]
    UnsupportedContent { url: String, content_type: String },

    /// HTML/text to Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The target host is loopback, private, or otherwise disallowed.
    #[error("blocked target: {0}")]
    Blocked(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed arguments (tool calls, CLI input files).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocFetchError>;

impl DocFetchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
