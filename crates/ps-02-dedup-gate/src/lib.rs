//! # Dedup Gate (ps-02)
//!
//! Persistent freshness cache answering "has this `ip:port` been processed
//! recently?".
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Identity | Key is the canonical `"ip:port"`; origin is ignored |
//! | 2 | Fail open | A store read error means "process it" |
//! | 3 | Unconditional mark | Every attempt overwrites the timestamp, success or not |
//! | 4 | Idempotent read | `should_process` never mutates gate state |
//! | 5 | Never processed | Absent, zero or wrong-length values count as never processed |
//!
//! Check-then-act is not atomic across workers. Two workers may both pass the
//! gate for the same key; the cost is one redundant probe.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Timestamp encoding and errors
//! - `ports/` - [`ProcessingGate`] (inbound) and [`KeyValueStore`] / [`TimeSource`] (outbound)
//! - `adapters/` - In-memory and RocksDB stores, clocks
//! - `service.rs` - [`DedupGate`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::clock::{ManualTimeSource, SystemTimeSource};
pub use adapters::memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb_store::{RocksDbConfig, RocksDbStore, CF_PROXIES};
pub use domain::errors::{DedupError, KVStoreError};
pub use domain::marks::ProcessedMarks;
pub use ports::inbound::ProcessingGate;
pub use ports::outbound::{KeyValueStore, TimeSource};
pub use service::{DedupGate, DEFAULT_FRESHNESS_WINDOW};
