//! Error types for Tactline.

use std::path::Path;
use thiserror::Error;

/// Main error type for Tactline operations.
///
/// Editing operations on the arrangement never produce these; they are
/// reserved for document parsing, configuration and file I/O.
#[derive(Error, Debug)]
pub enum TactlineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TactlineError {
    /// Wrap an I/O error on `path`; a missing file becomes [`NotFound`](Self::NotFound).
    pub fn io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            _ => Self::Io(err),
        }
    }
}

impl From<serde_json::Error> for TactlineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Tactline operations.
pub type Result<T> = std::result::Result<T, TactlineError>;
