//! # Proxy Sink (ps-04)
//!
//! Turns candidates into persisted results, in one of two modes:
//!
//! - **Stream** - [`ProxySink`], a fixed pool of symmetric workers draining a
//!   live candidate channel.
//! - **Bulk** - [`BulkTestCycle`], one pass over the pending rows of a
//!   [`CandidateStore`] under a counting semaphore, driven by the reconciler.
//!
//! ## Per-candidate flow (stream mode)
//!
//! ```text
//! recv ─→ gate.should_process ──no──→ skip
//!              │ yes
//!              ▼
//!         prober.probe ──cancelled──→ exit (not marked)
//!              │
//!              ├─ success ─→ results.upsert
//!              ▼
//!         gate.mark_processed   (success or not)
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Bounded workers | Worker count clamped to `[1, 1000]` |
//! | 2 | Unconditional mark | Every completed probe marks the candidate processed |
//! | 3 | No rollback | A result-store failure never undoes the dedup mark |
//! | 4 | Bounded burst | Bulk probes never exceed the configured concurrency |
//! | 5 | Drain on join | `join` returns only after every worker exits |

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::jsonl::{read_records, JsonLinesResultStore};
pub use adapters::memory::{CandidateRow, InMemoryCandidateStore, InMemoryResultStore};
pub use domain::config::{
    BulkConfig, SinkConfig, DEFAULT_BULK_PROBE_TIMEOUT, DEFAULT_MAX_CONCURRENCY, DEFAULT_PAGE_SIZE,
    DEFAULT_RETRY_INTERVAL, DEFAULT_WORKERS, MAX_WORKERS,
};
pub use domain::errors::{CycleError, StoreError};
pub use domain::record::to_record;
pub use domain::stats::{SinkStats, SinkStatsSnapshot};
pub use ports::outbound::{CandidateStore, ResultStore};
pub use service::bulk::{BulkCycleReport, BulkTestCycle};
pub use service::sink::{ProxySink, SinkDependencies};
