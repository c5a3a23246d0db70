//! # Ports Layer
//!
//! - `inbound.rs` - Driving port consumed by the sink
//! - `outbound.rs` - Driven ports the host supplies (store, clock)

pub mod inbound;
pub mod outbound;
