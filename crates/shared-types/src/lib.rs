//! # Shared Types Crate
//!
//! This crate contains the entities every Proxy-Scout subsystem exchanges:
//! the [`Candidate`] emitted by feeds, the closed [`Protocol`] set probed by
//! the prober, and the [`TestRecord`] persisted by the sink.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identity keys (`"ip:port"`) are computed here
//!   and nowhere else.
//! - **Normalize at the edge**: a `Candidate` can only be built from a valid
//!   IPv4 address, so every downstream component may assume canonical input.
//! - **Closed protocol set**: protocols are a tagged enumeration with a fixed
//!   priority table, never compared as free-form strings.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
