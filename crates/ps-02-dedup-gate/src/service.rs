//! # Dedup Gate Service

use std::time::Duration;

use shared_types::Candidate;
use tracing::{debug, warn};

use crate::adapters::clock::SystemTimeSource;
use crate::domain::errors::DedupError;
use crate::domain::marks::ProcessedMarks;
use crate::ports::inbound::ProcessingGate;
use crate::ports::outbound::{KeyValueStore, TimeSource};

/// Default freshness window: 8 hours.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(8 * 60 * 60);

/// Freshness gate over a key-value store.
pub struct DedupGate<KV, TS = SystemTimeSource> {
    store: KV,
    clock: TS,
}

impl<KV: KeyValueStore> DedupGate<KV, SystemTimeSource> {
    pub fn new(store: KV) -> Self {
        Self {
            store,
            clock: SystemTimeSource,
        }
    }
}

impl<KV: KeyValueStore, TS: TimeSource> DedupGate<KV, TS> {
    pub fn with_clock(store: KV, clock: TS) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &KV {
        &self.store
    }

    /// Last processed time of `candidate` in epoch nanoseconds.
    pub fn last_processed(&self, candidate: &Candidate) -> Result<Option<u64>, DedupError> {
        let raw = self.store.get(&candidate.key_bytes())?;
        Ok(raw.as_deref().and_then(ProcessedMarks::decode))
    }

    /// True if `candidate` was never processed or `now - last >= window`.
    ///
    /// Fails open: a store read error answers `true`.
    pub fn should_process(&self, candidate: &Candidate, window: Duration) -> bool {
        let last = match self.last_processed(candidate) {
            Ok(Some(nanos)) => nanos,
            Ok(None) => return true,
            Err(err) => {
                warn!(proxy = %candidate, error = %err, "dedup read failed, processing anyway");
                return true;
            }
        };
        let elapsed = Duration::from_nanos(self.clock.now_nanos().saturating_sub(last));
        let fresh_enough = elapsed >= window;
        if !fresh_enough {
            debug!(proxy = %candidate, elapsed_secs = elapsed.as_secs(), "recently processed");
        }
        fresh_enough
    }

    /// Overwrite the stored timestamp with now.
    pub fn mark_processed(&self, candidate: &Candidate) -> Result<(), DedupError> {
        let value = ProcessedMarks::encode(self.clock.now_nanos());
        self.store.put(&candidate.key_bytes(), &value)?;
        Ok(())
    }
}

impl<KV: KeyValueStore, TS: TimeSource> ProcessingGate for DedupGate<KV, TS> {
    fn should_process(&self, candidate: &Candidate, window: Duration) -> bool {
        DedupGate::should_process(self, candidate, window)
    }

    fn mark_processed(&self, candidate: &Candidate) -> Result<(), DedupError> {
        DedupGate::mark_processed(self, candidate)
    }
}
