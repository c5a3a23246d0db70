use std::time::Duration;

/// Transient bookkeeping owned by one running [`crate::Reconciler`].
///
/// Returned when the loop exits so callers can log a summary. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileCycleState {
    /// Failures since the last success. Mirrors the fail-backoff position.
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Delay chosen after the most recent cycle.
    pub last_delay: Option<Duration>,
}

impl ReconcileCycleState {
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_successes += 1;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures += 1;
    }

    /// Cycles run so far.
    pub fn total_cycles(&self) -> u64 {
        self.total_successes + self.total_failures
    }
}
