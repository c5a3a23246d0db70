//! # Service Layer
//!
//! - `sink.rs` - stream-mode worker pool
//! - `bulk.rs` - bulk test cycle over a candidate store

pub mod bulk;
pub mod sink;
