//! # Error Types
//!
//! Defines error types raised while normalizing external input.

use thiserror::Error;

/// Errors raised when raw feed input cannot be turned into a [`crate::Candidate`].
///
/// Every variant is terminal for the offending input: the candidate is
/// dropped, logged at warn level and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    /// Host part does not consist of exactly four dot-separated parts.
    #[error("invalid IP format: {0}")]
    MalformedHost(String),

    /// One of the four host parts is not a decimal number.
    #[error("invalid IP segment: {0}")]
    InvalidOctet(String),

    /// Re-serialized host does not parse as an IPv4 address.
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// Port is not an integer in `0..=65535`.
    #[error("invalid port number: {0}")]
    InvalidPort(String),

    /// Protocol label is outside the supported set.
    #[error("unsupported protocol {0:?}")]
    UnsupportedProtocol(String),
}
