use shared_types::{Candidate, Protocol};
use tracing::{debug, info, warn};

use crate::domain::errors::ProbeError;
use crate::domain::result::{BestResult, ProbeResult};
use crate::ports::outbound::ProbeObserver;

/// Emits every probe outcome as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProbeObserver;

impl ProbeObserver for TracingProbeObserver {
    fn on_protocol_outcome(&self, candidate: &Candidate, protocol: Protocol, result: &ProbeResult) {
        let ws = result.websocket.as_ref();
        debug!(
            proxy = %candidate,
            %protocol,
            success = result.success,
            duration_ms = result.duration.as_millis() as u64,
            websocket = ws.map(|w| w.success),
            websocket_ms = ws.map(|w| w.duration.as_millis() as u64),
            websocket_error = ws.and_then(|w| w.error.as_deref()),
            exposes_ip = result.exposes_ip,
            fetch_success = result.fetch_success,
            error = result.error.as_deref(),
            "protocol probe finished"
        );
    }

    fn on_best_result(&self, candidate: &Candidate, best: &BestResult) {
        if best.success() {
            info!(
                proxy = %candidate,
                protocol = %best.protocol,
                duration_ms = best.result.duration.as_millis() as u64,
                websocket = best.result.websocket_succeeded(),
                anonymous = !best.result.exposes_ip,
                fetch_success = best.result.fetch_success,
                "working proxy"
            );
        } else {
            debug!(proxy = %candidate, error = best.result.error.as_deref(), "no working protocol");
        }
    }

    fn on_probe_error(&self, candidate: &Candidate, error: &ProbeError) {
        match error {
            ProbeError::Cancelled => debug!(proxy = %candidate, "probe cancelled"),
            other => warn!(proxy = %candidate, error = %other, "probe failed"),
        }
    }
}
