//! Sink counters, updated lock-free by every worker.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SinkStats {
    received: AtomicU64,
    skipped: AtomicU64,
    probed: AtomicU64,
    persisted: AtomicU64,
    store_errors: AtomicU64,
    mark_errors: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`SinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStatsSnapshot {
    pub received: u64,
    /// Filtered by the dedup gate.
    pub skipped: u64,
    /// Probes that ran to completion, successful or not.
    pub probed: u64,
    pub persisted: u64,
    pub store_errors: u64,
    pub mark_errors: u64,
    pub cancelled: u64,
}

impl SinkStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probed(&self) {
        self.probed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mark_error(&self) {
        self.mark_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkStatsSnapshot {
        SinkStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            probed: self.probed.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            mark_errors: self.mark_errors.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
