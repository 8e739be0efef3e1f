//! Error taxonomy for OIV.
//!
//! Analysis never fails: sparse or degenerate input degrades to a neutral
//! result. Errors come only from configuration and report persistence.

/// OIV errors.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("invalid run id: {0:?}")]
    InvalidRunId(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for OIV operations.
pub type Result<T> = std::result::Result<T, IntegrityError>;
