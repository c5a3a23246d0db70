//! # Test Utilities
//!
//! A scripted [`ProbeTransport`] so prober behaviour can be exercised under
//! paused tokio time without touching the network.
//!
//! Enable with the `test-utils` feature from other crates.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_types::Protocol;

use crate::domain::config::FetchResponse;
use crate::domain::errors::TransportError;
use crate::ports::outbound::{ConnectivityReport, ProbeTransport, ProxyTarget};

/// Relay-facing behaviour of one protocol.
#[derive(Debug, Clone)]
pub struct ProtocolScript {
    pub connectivity: Result<ConnectivityReport, TransportError>,
    pub connect_delay: Duration,
    /// One entry per attempt; the last entry repeats.
    pub websocket: VecDeque<Result<(), TransportError>>,
    pub websocket_delay: Duration,
    pub echo: Result<Value, TransportError>,
    pub fetch: Result<FetchResponse, TransportError>,
}

impl ProtocolScript {
    /// Connection refused on connectivity.
    pub fn unreachable() -> Self {
        Self {
            connectivity: Err(io::Error::from(io::ErrorKind::ConnectionRefused).into()),
            connect_delay: Duration::ZERO,
            websocket: VecDeque::from([Err(TransportError::WebSocket("not scripted".into()))]),
            websocket_delay: Duration::ZERO,
            echo: Err(TransportError::Http("not scripted".into())),
            fetch: Err(TransportError::Http("not scripted".into())),
        }
    }

    /// Anonymous relay that passes every sub-probe instantly.
    pub fn working() -> Self {
        Self {
            connectivity: Ok(ConnectivityReport {
                status: 200,
                response_headers: vec![("content-type".into(), "application/json".into())],
                body: Some(json!({ "headers": { "Host": "httpbin.org" } })),
            }),
            connect_delay: Duration::ZERO,
            websocket: VecDeque::from([Ok(())]),
            websocket_delay: Duration::ZERO,
            echo: Ok(json!({ "origin": "198.51.100.200" })),
            fetch: Ok(FetchResponse {
                status: 200,
                headers: vec![("X-Probe-Marker".into(), "ok".into())],
                body: String::new(),
            }),
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        if let Ok(report) = &mut self.connectivity {
            report.status = status;
        }
        self
    }

    pub fn with_websocket(mut self, attempts: Vec<Result<(), TransportError>>) -> Self {
        self.websocket = attempts.into();
        self
    }

    pub fn with_websocket_delay(mut self, delay: Duration) -> Self {
        self.websocket_delay = delay;
        self
    }

    /// Echo `name: value` back inside the connectivity body.
    pub fn leaking_header(mut self, name: &str, value: &str) -> Self {
        if let Ok(ConnectivityReport {
            body: Some(body), ..
        }) = &mut self.connectivity
        {
            body["headers"][name] = Value::String(value.into());
        }
        self
    }

    /// IP-echo endpoints report `ip` as the caller.
    pub fn echoing(mut self, ip: Ipv4Addr) -> Self {
        self.echo = Ok(json!({ "origin": ip.to_string() }));
        self
    }

    pub fn with_echo(mut self, echo: Result<Value, TransportError>) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_fetch(mut self, fetch: Result<FetchResponse, TransportError>) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Calls observed per protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub connectivity: usize,
    pub websocket: usize,
    pub get_json: usize,
    pub fetch: usize,
}

/// [`ProbeTransport`] answering from per-protocol scripts. Unscripted
/// protocols are unreachable.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<Protocol, ProtocolScript>>,
    calls: Mutex<HashMap<Protocol, CallCounts>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, protocol: Protocol, script: ProtocolScript) -> Self {
        self.scripts.lock().insert(protocol, script);
        self
    }

    /// Script every protocol the same way.
    pub fn script_all(self, script: ProtocolScript) -> Self {
        {
            let mut scripts = self.scripts.lock();
            for protocol in Protocol::ALL {
                scripts.insert(protocol, script.clone());
            }
        }
        self
    }

    pub fn calls(&self, protocol: Protocol) -> CallCounts {
        self.calls.lock().get(&protocol).copied().unwrap_or_default()
    }

    fn current(&self, protocol: Protocol) -> ProtocolScript {
        self.scripts
            .lock()
            .get(&protocol)
            .cloned()
            .unwrap_or_else(ProtocolScript::unreachable)
    }

    fn count(&self, protocol: Protocol, bump: impl FnOnce(&mut CallCounts)) {
        bump(self.calls.lock().entry(protocol).or_default());
    }

    fn next_websocket(&self, protocol: Protocol) -> (Result<(), TransportError>, Duration) {
        let mut scripts = self.scripts.lock();
        let Some(script) = scripts.get_mut(&protocol) else {
            return (Err(TransportError::WebSocket("not scripted".into())), Duration::ZERO);
        };
        let outcome = if script.websocket.len() > 1 {
            script.websocket.pop_front()
        } else {
            script.websocket.front().cloned()
        };
        (
            outcome.unwrap_or(Ok(())),
            script.websocket_delay,
        )
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn connectivity(
        &self,
        target: ProxyTarget,
        _url: &str,
    ) -> Result<ConnectivityReport, TransportError> {
        self.count(target.protocol, |c| c.connectivity += 1);
        let script = self.current(target.protocol);
        tokio::time::sleep(script.connect_delay).await;
        script.connectivity
    }

    async fn websocket(&self, target: ProxyTarget, _url: &str) -> Result<(), TransportError> {
        self.count(target.protocol, |c| c.websocket += 1);
        let (outcome, delay) = self.next_websocket(target.protocol);
        tokio::time::sleep(delay).await;
        outcome
    }

    async fn get_json(&self, target: ProxyTarget, _url: &str) -> Result<Value, TransportError> {
        self.count(target.protocol, |c| c.get_json += 1);
        self.current(target.protocol).echo
    }

    async fn fetch(&self, target: ProxyTarget, _url: &str) -> Result<FetchResponse, TransportError> {
        self.count(target.protocol, |c| c.fetch += 1);
        self.current(target.protocol).fetch
    }
}
