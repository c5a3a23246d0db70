use std::time::Duration;

use shared_types::Candidate;

use crate::domain::errors::DedupError;

/// Freshness gate as seen by the workers that consult it.
pub trait ProcessingGate: Send + Sync {
    /// True if `candidate` was never processed or was last processed at
    /// least `window` ago. Never fails: store errors answer `true`.
    fn should_process(&self, candidate: &Candidate, window: Duration) -> bool;

    /// Record that `candidate` was processed now.
    fn mark_processed(&self, candidate: &Candidate) -> Result<(), DedupError>;
}
