//! Error types for the collections library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene and collection operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Path string is not a valid scene path
    #[error("Invalid scene path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Membership expression failed to parse
    #[error("Invalid path expression '{text}' at offset {offset}: {message}")]
    InvalidExpression {
        text: String,
        offset: usize,
        message: String,
    },

    /// No prim exists at the given path
    #[error("Prim not found: {0}")]
    PrimNotFound(String),

    /// Stored value has a different type than requested
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Layer index out of bounds
    #[error("Layer index {index} out of bounds (count: {count})")]
    LayerOutOfBounds { index: usize, count: usize },

    /// Scene file does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// True for syntax errors in a membership expression.
    pub fn is_expression_error(&self) -> bool {
        matches!(self, Self::InvalidExpression { .. })
    }
}

/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidExpression {
            text: "/a &".into(),
            offset: 4,
            message: "expected a pattern".into(),
        };
        assert!(e.to_string().contains("offset 4"));
        assert!(e.is_expression_error());

        let e = Error::LayerOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
        assert!(!e.is_expression_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
