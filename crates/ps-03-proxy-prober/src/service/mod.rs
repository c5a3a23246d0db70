//! # Proxy Prober Service
//!
//! Fan-out/fan-in over the five protocols of one candidate:
//!
//! ```text
//!               ┌─ HTTP    ─┐
//!               ├─ HTTPS   ─┤
//! candidate ───►├─ SOCKS4  ─┼──► ProbeSet ──► select_best ──► BestResult
//!               ├─ SOCKS4A ─┤
//!               └─ SOCKS5  ─┘
//!          (one task each, shared deadline)
//! ```
//!
//! Each protocol task runs the connectivity probe and, if it connects, the
//! WebSocket, anonymity and fetch sub-probes concurrently. Tasks never share
//! state; results are collected by protocol index so completion order cannot
//! influence selection.

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{Candidate, Protocol};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::adapters::observer::TracingProbeObserver;
use crate::domain::anonymity::{echoed_headers, headers_expose_ip, origin_matches, reported_origin};
use crate::domain::config::{ProberConfig, SUB_PROBE_ATTEMPTS, SUB_PROBE_RETRY_DELAY};
use crate::domain::errors::{ProbeError, TransportError};
use crate::domain::result::{BestResult, ProbeResult, ProbeSet, WebSocketOutcome};
use crate::domain::selection::select_best;
use crate::ports::inbound::Prober;
use crate::ports::outbound::{ProbeObserver, ProbeTransport, ProxyTarget};

/// Error recorded for a protocol that ran out of time.
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "probe deadline exceeded";

/// Multi-protocol prober.
pub struct ProxyProber {
    transport: Arc<dyn ProbeTransport>,
    observer: Arc<dyn ProbeObserver>,
    config: Arc<ProberConfig>,
}

impl ProxyProber {
    pub fn new(transport: Arc<dyn ProbeTransport>, config: ProberConfig) -> Self {
        Self {
            transport,
            observer: Arc::new(TracingProbeObserver),
            config: Arc::new(config),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProbeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Probe every protocol of `candidate` and select the best result.
    ///
    /// Returns [`ProbeError::Cancelled`] as soon as `cancel` fires, aborting
    /// every in-flight sub-probe, and [`ProbeError::DeadlineExceeded`] only
    /// when all five protocols ran out of time.
    pub async fn check(
        &self,
        candidate: &Candidate,
        cancel: &CancellationToken,
    ) -> Result<BestResult, ProbeError> {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;
        let mut tasks = JoinSet::new();

        for protocol in Protocol::ALL {
            let probe = ProtocolProbe {
                transport: Arc::clone(&self.transport),
                config: Arc::clone(&self.config),
                target: ProxyTarget::new(candidate, protocol),
                relay_ip: candidate.ip(),
            };
            tasks.spawn(async move {
                match time::timeout_at(deadline, probe.run()).await {
                    Ok(result) => (protocol, result, false),
                    Err(_) => (
                        protocol,
                        ProbeResult::failed(timeout, DEADLINE_EXCEEDED_MESSAGE),
                        true,
                    ),
                }
            });
        }

        let mut slots: [Option<ProbeResult>; 5] = Default::default();
        let mut expired = 0;
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.fail(candidate, ProbeError::Cancelled)),
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            let (protocol, result, timed_out) = match joined {
                Ok(outcome) => outcome,
                Err(err) => return Err(self.fail(candidate, ProbeError::Join(err.to_string()))),
            };
            if timed_out {
                expired += 1;
            }
            self.observer.on_protocol_outcome(candidate, protocol, &result);
            slots[protocol.index()] = Some(result);
        }

        if expired == Protocol::ALL.len() {
            return Err(self.fail(candidate, ProbeError::DeadlineExceeded));
        }

        let set = ProbeSet::from_fn(|p| {
            slots[p.index()]
                .take()
                .unwrap_or_else(|| ProbeResult::failed(Duration::ZERO, "probe not run"))
        });
        let best = select_best(&set);
        self.observer.on_best_result(candidate, &best);
        Ok(best)
    }

    fn fail(&self, candidate: &Candidate, err: ProbeError) -> ProbeError {
        self.observer.on_probe_error(candidate, &err);
        err
    }
}

#[async_trait]
impl Prober for ProxyProber {
    async fn probe(
        &self,
        candidate: &Candidate,
        cancel: &CancellationToken,
    ) -> Result<BestResult, ProbeError> {
        self.check(candidate, cancel).await
    }
}

/// Everything one protocol task needs. Owned, so the task is `'static`.
struct ProtocolProbe {
    transport: Arc<dyn ProbeTransport>,
    config: Arc<ProberConfig>,
    target: ProxyTarget,
    relay_ip: Ipv4Addr,
}

impl ProtocolProbe {
    async fn run(self) -> ProbeResult {
        let url = match self.target.protocol {
            Protocol::Https => &self.config.https_ip_url,
            _ => &self.config.http_get_url,
        };

        let started = Instant::now();
        let outcome = self.transport.connectivity(self.target, url).await;
        let duration = started.elapsed();

        let report = match outcome {
            Ok(report) if (200..300).contains(&report.status) => report,
            Ok(report) => {
                return ProbeResult::failed(duration, TransportError::Status(report.status).to_string())
            }
            Err(err) => return ProbeResult::failed(duration, err.to_string()),
        };

        let echoed = report.body.as_ref().map(echoed_headers).unwrap_or_default();
        let leaks = headers_expose_ip(
            report
                .response_headers
                .iter()
                .chain(echoed.iter())
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        let (websocket, echo_match, fetch_success) =
            tokio::join!(self.websocket(), self.echo_reports_relay(), self.fetch());

        ProbeResult {
            success: true,
            duration,
            error: None,
            websocket: Some(websocket),
            exposes_ip: leaks || echo_match,
            fetch_success,
        }
    }

    async fn websocket(&self) -> WebSocketOutcome {
        let url = &self.config.websocket_url;
        let (outcome, duration) = with_retry(|| self.transport.websocket(self.target, url)).await;
        WebSocketOutcome {
            success: outcome.is_ok(),
            duration,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Ask the IP-echo endpoints in order; the first usable answer decides.
    async fn echo_reports_relay(&self) -> bool {
        for url in &self.config.ip_echo_urls {
            let (body, _) = with_retry(|| self.transport.get_json(self.target, url)).await;
            let Ok(body) = body else {
                continue;
            };
            if let Some(origin) = reported_origin(&body) {
                return origin_matches(origin, self.relay_ip);
            }
        }
        false
    }

    async fn fetch(&self) -> bool {
        let url = &self.config.fetch_url;
        let (response, _) = with_retry(|| self.transport.fetch(self.target, url)).await;
        response
            .map(|r| self.config.fetch_marker.matches(&r))
            .unwrap_or(false)
    }
}

/// Run `attempt` up to [`SUB_PROBE_ATTEMPTS`] times, pausing between tries,
/// as long as failures are transient. Returns the final outcome and the
/// duration of the final attempt.
async fn with_retry<T, F, Fut>(mut attempt: F) -> (Result<T, TransportError>, Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut tries = 1;
    loop {
        let started = Instant::now();
        let outcome = attempt().await;
        let elapsed = started.elapsed();
        match outcome {
            Err(err) if err.is_transient() && tries < SUB_PROBE_ATTEMPTS => {
                trace!(error = %err, attempt = tries, "transient sub-probe failure, retrying");
                tries += 1;
                time::sleep(SUB_PROBE_RETRY_DELAY).await;
            }
            other => return (other, elapsed),
        }
    }
}
