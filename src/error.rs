//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the data pipeline and trainer
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}:{line}: malformed line (expected `token<TAB>tag`): {text:?}", path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
