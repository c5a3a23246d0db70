//! # Adapters Layer
//!
//! - `memory.rs` - in-memory result and candidate stores
//! - `jsonl.rs` - append-only JSON-lines result file

pub mod jsonl;
pub mod memory;
