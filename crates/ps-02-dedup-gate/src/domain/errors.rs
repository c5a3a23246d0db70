//! # Error Types

use thiserror::Error;

/// Key-value store adapter errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IoError { message: String },

    /// The store was opened without its expected namespace.
    #[error("KV store namespace missing: {0}")]
    MissingNamespace(String),
}

/// Errors surfaced by the dedup gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DedupError {
    #[error("dedup store failure: {0}")]
    Store(#[from] KVStoreError),
}
