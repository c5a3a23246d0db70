//! # Probe Results
//!
//! Values produced once per probe attempt and never mutated afterwards.

use std::time::Duration;

use shared_types::Protocol;

/// Outcome of the WebSocket sub-probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketOutcome {
    pub success: bool,
    /// Dial duration of the final attempt.
    pub duration: Duration,
    pub error: Option<String>,
}

/// Outcome of probing one protocol against one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Connectivity probe succeeded.
    pub success: bool,
    /// Connectivity latency.
    pub duration: Duration,
    pub error: Option<String>,
    /// `None` when connectivity failed and secondary probes were skipped.
    pub websocket: Option<WebSocketOutcome>,
    /// A leak header was present or an IP-echo endpoint reported the relay IP.
    pub exposes_ip: bool,
    /// The fetch probe matched the configured response marker.
    pub fetch_success: bool,
}

impl ProbeResult {
    /// Failed connectivity probe.
    pub fn failed(duration: Duration, error: impl Into<String>) -> Self {
        Self {
            success: false,
            duration,
            error: Some(error.into()),
            websocket: None,
            exposes_ip: false,
            fetch_success: false,
        }
    }

    /// True if the WebSocket sub-probe ran and succeeded.
    pub fn websocket_succeeded(&self) -> bool {
        self.websocket.as_ref().is_some_and(|ws| ws.success)
    }
}

/// The protocol chosen for a candidate, with its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestResult {
    pub protocol: Protocol,
    pub result: ProbeResult,
}

impl BestResult {
    /// Overall success. Callers must check this before using the result.
    pub fn success(&self) -> bool {
        self.result.success
    }
}

/// One result per protocol, indexed by [`Protocol::index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSet {
    results: [ProbeResult; 5],
}

impl ProbeSet {
    /// Build a complete set by evaluating `f` for every protocol.
    pub fn from_fn(mut f: impl FnMut(Protocol) -> ProbeResult) -> Self {
        Self {
            results: std::array::from_fn(|i| f(Protocol::ALL[i])),
        }
    }

    pub fn get(&self, protocol: Protocol) -> &ProbeResult {
        &self.results[protocol.index()]
    }

    /// Results in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Protocol, &ProbeResult)> {
        Protocol::ALL.into_iter().zip(self.results.iter())
    }
}
