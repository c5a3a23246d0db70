//! # Proxy Prober (ps-03)
//!
//! Probes one candidate relay over every supported protocol concurrently and
//! selects a single best result.
//!
//! ## Per-protocol probe
//!
//! 1. **Connectivity** - GET through the relay (HTTPS uses the IP-echo URL).
//!    A failure here skips everything else for that protocol.
//! 2. **WebSocket** - handshake to a public echo endpoint, then close.
//! 3. **Anonymity** - leak headers plus IP-echo endpoints queried in order.
//! 4. **Fetch** - GET a known URL and match a response marker.
//!
//! Steps 2-4 run concurrently. Only 2 and the GETs in 3-4 are retried, once,
//! and only on transient transport errors.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Shared deadline | One timeout bounds all five protocols together |
//! | 2 | Deterministic selection | Same result set always yields the same best protocol |
//! | 3 | Cancellation | Cancelling aborts every in-flight sub-probe |
//! | 4 | Full reporting | Every protocol outcome reaches the [`ProbeObserver`] |
//!
//! ## Features
//!
//! - `network` (default) - [`HttpProbeTransport`] over reqwest, tokio-socks
//!   and tokio-tungstenite
//! - `test-utils` - [`testing::ScriptedTransport`] for downstream tests

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(feature = "network")]
pub use adapters::http_transport::HttpProbeTransport;
pub use adapters::observer::TracingProbeObserver;
pub use domain::config::{
    FetchResponse, ProberConfig, ResponseMarker, DEFAULT_IP_ECHO_URLS, DEFAULT_PROBE_TIMEOUT,
};
pub use domain::errors::{ProbeError, TransportError};
pub use domain::result::{BestResult, ProbeResult, ProbeSet, WebSocketOutcome};
pub use domain::selection::select_best;
pub use ports::inbound::Prober;
pub use ports::outbound::{ConnectivityReport, ProbeObserver, ProbeTransport, ProxyTarget};
pub use service::{ProxyProber, DEADLINE_EXCEEDED_MESSAGE};
