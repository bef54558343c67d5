//! Error types for blob storage and configuration.
//!
//! Covers file I/O, configuration parsing, and integrity failures in the
//! content-addressed store.

use thiserror::Error;

/// Errors that can occur in blob store or configuration operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// No plain or compressed blob exists under this digest.
    #[error("no such blob: '{0}'")]
    BlobNotFound(String),

    /// A digest was not 64 lowercase hex characters.
    #[error("invalid digest '{0}'")]
    InvalidDigest(String),

    /// Stored bytes no longer hash to their file name.
    #[error("digest mismatch for blob {expected}: content hashes to {actual}")]
    DigestMismatch { expected: String, actual: String },
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
