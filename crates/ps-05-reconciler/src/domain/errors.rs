use thiserror::Error;

/// Outcome of a failed reconcile cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The cycle failed and should be retried after the fail-backoff delay.
    #[error("reconcile failed: {0}")]
    Failed(String),

    /// The cycle observed cancellation; the loop exits without sleeping.
    #[error("reconcile cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Wrap any displayable error as a retryable failure.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}
