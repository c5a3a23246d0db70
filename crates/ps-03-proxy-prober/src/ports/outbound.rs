//! # Outbound Ports (Driven Ports)
//!
//! Production: `HttpProbeTransport` (feature `network`), `TracingProbeObserver`.
//! Testing: `ScriptedTransport` (feature `test-utils`).

use std::net::SocketAddr;

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{Candidate, Protocol};

use crate::domain::config::FetchResponse;
use crate::domain::errors::{ProbeError, TransportError};
use crate::domain::result::{BestResult, ProbeResult};

/// A relay and the protocol used to speak to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyTarget {
    pub addr: SocketAddr,
    pub protocol: Protocol,
}

impl ProxyTarget {
    pub fn new(candidate: &Candidate, protocol: Protocol) -> Self {
        Self {
            addr: candidate.socket_addr(),
            protocol,
        }
    }
}

/// Response of the connectivity GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub status: u16,
    pub response_headers: Vec<(String, String)>,
    /// Parsed JSON body, if the body was JSON.
    pub body: Option<Value>,
}

/// Network operations routed through a relay.
///
/// Each call is one attempt; retries and timing belong to the caller.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// GET `url` through the relay.
    async fn connectivity(
        &self,
        target: ProxyTarget,
        url: &str,
    ) -> Result<ConnectivityReport, TransportError>;

    /// Complete a WebSocket handshake to `url` through the relay, then close
    /// normally.
    async fn websocket(&self, target: ProxyTarget, url: &str) -> Result<(), TransportError>;

    /// GET `url` through the relay and parse the body as JSON.
    async fn get_json(&self, target: ProxyTarget, url: &str) -> Result<Value, TransportError>;

    /// GET `url` through the relay, returning status, headers and body.
    async fn fetch(&self, target: ProxyTarget, url: &str) -> Result<FetchResponse, TransportError>;
}

/// Receives every probe outcome. Nothing the prober learns is discarded
/// without passing through here.
pub trait ProbeObserver: Send + Sync {
    /// One protocol of one candidate finished.
    fn on_protocol_outcome(&self, candidate: &Candidate, protocol: Protocol, result: &ProbeResult);

    /// Selection finished for a candidate.
    fn on_best_result(&self, candidate: &Candidate, best: &BestResult);

    /// The candidate-level probe failed.
    fn on_probe_error(&self, _candidate: &Candidate, _error: &ProbeError) {}
}
