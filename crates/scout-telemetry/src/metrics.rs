//! Prometheus metrics for Proxy-Scout components.
//!
//! All metrics follow the naming convention: `ps_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PROBER METRICS
    // =========================================================================

    /// Per-protocol probe outcomes
    pub static ref PROTOCOL_PROBES: CounterVec = CounterVec::new(
        Opts::new("ps_prober_protocol_probes_total", "Protocol probes by outcome"),
        &["protocol", "outcome"]  // outcome: success/failure/expired
    ).expect("metric creation failed");

    /// Per-candidate probe outcomes
    pub static ref CANDIDATES_PROBED: CounterVec = CounterVec::new(
        Opts::new("ps_prober_candidates_total", "Candidates probed by outcome"),
        &["outcome"]  // outcome: working/dead/error
    ).expect("metric creation failed");

    /// Duration of a winning protocol probe
    pub static ref PROBE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ps_prober_probe_duration_seconds",
            "Duration of the selected protocol probe"
        ).buckets(exponential_buckets(0.01, 2.0, 13).expect("bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // SINK METRICS
    // =========================================================================

    /// Results written to the result store
    pub static ref RESULTS_PERSISTED: Counter = Counter::new(
        "ps_sink_results_persisted_total",
        "Test records written to the result store"
    ).expect("metric creation failed");

    /// Candidates skipped by the dedup gate
    pub static ref CANDIDATES_SKIPPED: Counter = Counter::new(
        "ps_sink_candidates_skipped_total",
        "Candidates skipped because they were processed recently"
    ).expect("metric creation failed");

    // =========================================================================
    // DEDUP METRICS
    // =========================================================================

    /// Key-value store failures
    pub static ref DEDUP_STORE_ERRORS: CounterVec = CounterVec::new(
        Opts::new("ps_dedup_store_errors_total", "Dedup store failures by operation"),
        &["op"]  // op: get/set
    ).expect("metric creation failed");

    // =========================================================================
    // RECONCILER METRICS
    // =========================================================================

    /// Scheduler cycles
    pub static ref RECONCILER_CYCLES: CounterVec = CounterVec::new(
        Opts::new("ps_reconciler_cycles_total", "Reconcile cycles by task and outcome"),
        &["task", "outcome"]  // outcome: success/failure/cancelled
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PROTOCOL_PROBES.clone()),
        Box::new(CANDIDATES_PROBED.clone()),
        Box::new(PROBE_DURATION.clone()),
        Box::new(RESULTS_PERSISTED.clone()),
        Box::new(CANDIDATES_SKIPPED.clone()),
        Box::new(DEDUP_STORE_ERRORS.clone()),
        Box::new(RECONCILER_CYCLES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_encode_contains_families() {
        register_metrics().unwrap();
        PROTOCOL_PROBES.with_label_values(&["socks5", "success"]).inc();
        RECONCILER_CYCLES.with_label_values(&["bulk-test", "success"]).inc();
        RESULTS_PERSISTED.inc();

        let text = encode_metrics().unwrap();
        assert!(text.contains("ps_prober_protocol_probes_total"));
        assert!(text.contains(r#"protocol="socks5""#));
        assert!(text.contains("ps_reconciler_cycles_total"));
        assert!(text.contains("ps_sink_results_persisted_total"));
    }

    #[test]
    fn test_histogram_observes() {
        let before = PROBE_DURATION.get_sample_count();
        PROBE_DURATION.observe(0.25);
        assert!(PROBE_DURATION.get_sample_count() > before);
    }
}
