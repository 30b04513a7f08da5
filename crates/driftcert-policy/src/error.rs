//! Error types for policy loading.

use std::path::PathBuf;

/// A policy document could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("policy read error at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("policy yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file extension selects no known document format.
    #[error("unsupported policy format: {0}")]
    UnsupportedFormat(String),
}

/// An invariant whose locator pattern cannot match anything useful.
///
/// Not fatal: the invariant is skipped and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[error("invariant config error in {name}: unknown locator pattern {pattern:?}")]
pub struct InvariantConfigError {
    pub name: String,
    pub pattern: String,
}
