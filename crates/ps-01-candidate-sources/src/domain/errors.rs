use thiserror::Error;

/// Failure of one feed poll. Every variant except `Cancelled` and
/// `SinkClosed` is retried by the reconciler's fail-backoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed feed response: {0}")]
    Decode(String),

    /// Rate-limited and the backoff policy gave up.
    #[error("retry limit reached")]
    RetryLimit,

    #[error("source cancelled")]
    Cancelled,

    /// The downstream channel is gone.
    #[error("candidate sink closed")]
    SinkClosed,
}
