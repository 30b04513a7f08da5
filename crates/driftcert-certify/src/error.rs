//! Error types for certification runs.

use driftcert_kernel::KernelError;

/// A run either completes with a full result or fails with one of these.
#[derive(Debug, thiserror::Error)]
pub enum CertifyError {
    /// A mandatory input (risk counts, policy config) is missing.
    #[error("incomplete input: {0}")]
    IncompleteInput(String),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// The output could not be serialized for digesting.
    #[error("output serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
