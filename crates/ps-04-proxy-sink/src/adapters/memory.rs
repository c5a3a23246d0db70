//! # In-Memory Stores
//!
//! Used by tests and dry runs. Both stores are safe to share across workers.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::{Candidate, RecordKey, TestRecord};

use crate::domain::config::DEFAULT_RETRY_INTERVAL;
use crate::domain::errors::StoreError;
use crate::ports::outbound::{CandidateStore, ResultStore};

// =============================================================================
// RESULT STORE
// =============================================================================

/// Result store keeping records in key order.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    records: RwLock<BTreeMap<RecordKey, TestRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `upsert` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<TestRecord> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn upsert(&self, record: &TestRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.records
            .write()
            .insert(record.record_key(), record.clone());
        Ok(())
    }
}

// =============================================================================
// CANDIDATE STORE
// =============================================================================

/// Test history of one stored candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub candidate: Candidate,
    pub last_tested: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Candidate pool ordered by `ip:port`.
#[derive(Debug)]
pub struct InMemoryCandidateStore {
    rows: RwLock<BTreeMap<(u32, u16), CandidateRow>>,
    retry_interval: Duration,
}

impl Default for InMemoryCandidateStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

impl InMemoryCandidateStore {
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            retry_interval,
        }
    }

    pub fn row(&self, candidate: &Candidate) -> Option<CandidateRow> {
        self.rows.read().get(&row_key(candidate)).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn is_pending(&self, row: &CandidateRow, now: DateTime<Utc>) -> bool {
        match row.last_tested {
            None => true,
            Some(at) => (now - at)
                .to_std()
                .map(|elapsed| elapsed >= self.retry_interval)
                .unwrap_or(false),
        }
    }
}

fn row_key(candidate: &Candidate) -> (u32, u16) {
    (u32::from(candidate.ip()), candidate.port())
}

#[async_trait]
impl CandidateStore for InMemoryCandidateStore {
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<(), StoreError> {
        self.rows
            .write()
            .entry(row_key(candidate))
            .or_insert_with(|| CandidateRow {
                candidate: candidate.clone(),
                last_tested: None,
                last_error: None,
            });
        Ok(())
    }

    async fn count_pending(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        Ok(self
            .rows
            .read()
            .values()
            .filter(|row| self.is_pending(row, now))
            .count())
    }

    async fn list_pending(
        &self,
        after: Option<&Candidate>,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        let now = Utc::now();
        let start = after.map_or(Bound::Unbounded, |c| Bound::Excluded(row_key(c)));
        Ok(self
            .rows
            .read()
            .range((start, Bound::Unbounded))
            .map(|(_, row)| row)
            .filter(|row| self.is_pending(row, now))
            .take(limit)
            .map(|row| row.candidate.clone())
            .collect())
    }

    async fn record_tested(
        &self,
        candidate: &Candidate,
        tested_at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        let row = rows.entry(row_key(candidate)).or_insert_with(|| CandidateRow {
            candidate: candidate.clone(),
            last_tested: None,
            last_error: None,
        });
        row.last_tested = Some(tested_at);
        row.last_error = error;
        Ok(())
    }
}
