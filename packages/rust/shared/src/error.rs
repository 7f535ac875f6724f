//! Error types for askweb.
//!
//! Library crates use [`AskWebError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all askweb operations.
#[derive(Debug, thiserror::Error)]
pub enum AskWebError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the search provider or a model API.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or API response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Page-to-PDF rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// PDF merge or text extraction failed.
    #[error("document error: {0}")]
    Document(String),

    /// The model backend returned an error or an unusable response.
    #[error("model error: {0}")]
    Model(String),

    /// The model was queried before `initialize` succeeded.
    #[error("model not initialized: call initialize() with an API key first ({backend})")]
    Uninitialized { backend: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid arguments or violated preconditions.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AskWebError>;

impl AskWebError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an uninitialized-use error for the named backend.
    pub fn uninitialized(backend: impl Into<String>) -> Self {
        Self::Uninitialized {
            backend: backend.into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AskWebError::config("unknown backend 'gpt'");
        assert_eq!(err.to_string(), "config error: unknown backend 'gpt'");

        let err = AskWebError::validation("overlap 10 must be smaller than size 10");
        assert!(err.to_string().contains("overlap 10"));
    }

    #[test]
    fn uninitialized_names_backend() {
        let err = AskWebError::uninitialized("palm2");
        assert!(err.to_string().contains("palm2"));
        assert!(err.to_string().contains("initialize"));
    }
}
