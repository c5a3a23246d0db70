//! # Ports Layer
//!
//! The sink consumes [`ps_02_dedup_gate::ProcessingGate`] and
//! [`ps_03_proxy_prober::Prober`] directly; the stores it writes to are
//! declared here.

pub mod outbound;
