//! # Outbound Ports (Driven Ports)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{Candidate, TestRecord};

use crate::domain::errors::StoreError;

/// Durable home of validated results.
///
/// Production: `JsonLinesResultStore`. Testing: `InMemoryResultStore`.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or replace the record with the same
    /// `(ip, port, protocol, tested_at)` key.
    async fn upsert(&self, record: &TestRecord) -> Result<(), StoreError>;
}

/// Storage-resident candidate pool consumed by the bulk cycle.
///
/// A candidate is pending when it was never tested, or was last tested more
/// than the store's retry interval ago.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Add a candidate, keeping any test history it already has.
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<(), StoreError>;

    async fn count_pending(&self) -> Result<usize, StoreError>;

    /// Up to `limit` pending candidates ordered by `(ip, port)`, starting
    /// strictly after `after` when given.
    async fn list_pending(
        &self,
        after: Option<&Candidate>,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError>;

    /// Record the outcome of a test.
    async fn record_tested(
        &self,
        candidate: &Candidate,
        tested_at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<(), StoreError>;
}
