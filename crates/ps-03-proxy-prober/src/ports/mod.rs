//! # Ports Layer
//!
//! - `inbound.rs` - [`inbound::Prober`], consumed by the sink and bulk cycle
//! - `outbound.rs` - transport and observer the host supplies

pub mod inbound;
pub mod outbound;
