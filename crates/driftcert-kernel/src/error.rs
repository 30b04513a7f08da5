//! Error types for kernel operations.

use std::path::PathBuf;

/// A config file could not be parsed in its detected format.
///
/// Recoverable: the engine excludes the file from semantic diffing and
/// reports it as unparseable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error in {path} ({format}): {message}")]
pub struct ParseError {
    pub path: String,
    pub format: &'static str,
    pub message: String,
}

impl ParseError {
    pub fn new(path: impl Into<String>, format: &'static str, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            format,
            message: message.to_string(),
        }
    }
}

/// Errors arising while materializing snapshots or diffing them.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A snapshot root could not be read.
    #[error("snapshot error at {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot path is not representable as a relative UTF-8 path.
    #[error("invalid snapshot path: {0}")]
    InvalidPath(String),
}
