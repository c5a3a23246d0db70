//! # Sink Configuration

use std::time::Duration;

use ps_02_dedup_gate::DEFAULT_FRESHNESS_WINDOW;

pub const DEFAULT_WORKERS: usize = 15;
pub const MAX_WORKERS: usize = 1000;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;
pub const DEFAULT_BULK_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a tested candidate stays out of the pending set.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Stream-mode worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    workers: usize,
    pub freshness_window: Duration,
    /// Run gate lookups and marks on the blocking pool. Set this when the
    /// gate sits on a disk-backed store.
    pub offload_gate: bool,
}

impl SinkConfig {
    /// `workers` is clamped to `[1, MAX_WORKERS]`.
    pub fn new(workers: usize, freshness_window: Duration) -> Self {
        Self {
            workers: workers.clamp(1, MAX_WORKERS),
            freshness_window,
            offload_gate: false,
        }
    }

    pub fn with_gate_offload(mut self, offload: bool) -> Self {
        self.offload_gate = offload;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_FRESHNESS_WINDOW)
    }
}

/// Bulk test cycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkConfig {
    pub page_size: usize,
    pub max_concurrency: usize,
    /// Upper bound on one candidate probe, on top of the prober's own deadline.
    pub probe_timeout: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            probe_timeout: DEFAULT_BULK_PROBE_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_is_clamped() {
        assert_eq!(SinkConfig::new(0, Duration::ZERO).workers(), 1);
        assert_eq!(SinkConfig::new(15, Duration::ZERO).workers(), 15);
        assert_eq!(SinkConfig::new(50_000, Duration::ZERO).workers(), MAX_WORKERS);
    }

    #[test]
    fn test_defaults() {
        let sink = SinkConfig::default();
        assert_eq!(sink.workers(), 15);
        assert_eq!(sink.freshness_window, Duration::from_secs(8 * 3600));
        assert!(!sink.offload_gate);

        let bulk = BulkConfig::default();
        assert_eq!((bulk.page_size, bulk.max_concurrency), (50, 50));
        assert_eq!(bulk.probe_timeout, Duration::from_secs(30));
    }
}
