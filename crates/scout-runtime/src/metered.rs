//! # Metric Decorators
//!
//! Subsystem crates stay free of the metrics registry. The runtime wraps
//! their ports in the decorators below, each forwarding the call unchanged
//! and counting its outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{Candidate, Protocol, TestRecord};
use tokio_util::sync::CancellationToken;

use ps_02_dedup_gate::{DedupError, KVStoreError, KeyValueStore, ProcessingGate};
use ps_03_proxy_prober::{
    BestResult, ProbeError, ProbeObserver, ProbeResult, DEADLINE_EXCEEDED_MESSAGE,
};
use ps_04_proxy_sink::{ResultStore, StoreError};
use ps_05_reconciler::{Reconcile, ReconcileError};
use scout_telemetry::{
    CANDIDATES_PROBED, CANDIDATES_SKIPPED, DEDUP_STORE_ERRORS, PROBE_DURATION, PROTOCOL_PROBES,
    RECONCILER_CYCLES, RESULTS_PERSISTED,
};

// =============================================================================
// DEDUP
// =============================================================================

/// Counts key-value failures by operation.
pub struct MeteredKVStore<S> {
    inner: S,
}

impl<S: KeyValueStore> MeteredKVStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: KeyValueStore> KeyValueStore for MeteredKVStore<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(key).inspect_err(|_| {
            DEDUP_STORE_ERRORS.with_label_values(&["get"]).inc();
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.inner.put(key, value).inspect_err(|_| {
            DEDUP_STORE_ERRORS.with_label_values(&["set"]).inc();
        })
    }
}

/// Counts candidates the gate turns away.
pub struct MeteredGate {
    inner: Arc<dyn ProcessingGate>,
}

impl MeteredGate {
    pub fn new(inner: Arc<dyn ProcessingGate>) -> Self {
        Self { inner }
    }
}

impl ProcessingGate for MeteredGate {
    fn should_process(&self, candidate: &Candidate, window: Duration) -> bool {
        let process = self.inner.should_process(candidate, window);
        if !process {
            CANDIDATES_SKIPPED.inc();
        }
        process
    }

    fn mark_processed(&self, candidate: &Candidate) -> Result<(), DedupError> {
        self.inner.mark_processed(candidate)
    }
}

// =============================================================================
// PROBER
// =============================================================================

/// Feeds probe outcomes into the prober counters, then forwards them.
pub struct MetricsProbeObserver {
    inner: Arc<dyn ProbeObserver>,
}

impl MetricsProbeObserver {
    pub fn new(inner: Arc<dyn ProbeObserver>) -> Self {
        Self { inner }
    }
}

fn protocol_outcome(result: &ProbeResult) -> &'static str {
    if result.success {
        "success"
    } else if result.error.as_deref() == Some(DEADLINE_EXCEEDED_MESSAGE) {
        "expired"
    } else {
        "failure"
    }
}

impl ProbeObserver for MetricsProbeObserver {
    fn on_protocol_outcome(&self, candidate: &Candidate, protocol: Protocol, result: &ProbeResult) {
        PROTOCOL_PROBES
            .with_label_values(&[protocol.as_str(), protocol_outcome(result)])
            .inc();
        self.inner.on_protocol_outcome(candidate, protocol, result);
    }

    fn on_best_result(&self, candidate: &Candidate, best: &BestResult) {
        if best.success() {
            CANDIDATES_PROBED.with_label_values(&["working"]).inc();
            PROBE_DURATION.observe(best.result.duration.as_secs_f64());
        } else {
            CANDIDATES_PROBED.with_label_values(&["dead"]).inc();
        }
        self.inner.on_best_result(candidate, best);
    }

    fn on_probe_error(&self, candidate: &Candidate, error: &ProbeError) {
        if !matches!(error, ProbeError::Cancelled) {
            CANDIDATES_PROBED.with_label_values(&["error"]).inc();
        }
        self.inner.on_probe_error(candidate, error);
    }
}

// =============================================================================
// SINK
// =============================================================================

/// Counts successful result writes.
pub struct MeteredResultStore {
    inner: Arc<dyn ResultStore>,
}

impl MeteredResultStore {
    pub fn new(inner: Arc<dyn ResultStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ResultStore for MeteredResultStore {
    async fn upsert(&self, record: &TestRecord) -> Result<(), StoreError> {
        self.inner.upsert(record).await?;
        RESULTS_PERSISTED.inc();
        Ok(())
    }
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Counts reconcile cycles per task and outcome.
pub struct MeteredReconcile {
    inner: Arc<dyn Reconcile>,
}

impl MeteredReconcile {
    pub fn new(inner: Arc<dyn Reconcile>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Reconcile for MeteredReconcile {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn reconcile(&self, cancel: &CancellationToken) -> Result<(), ReconcileError> {
        let result = self.inner.reconcile(cancel).await;
        let outcome = match &result {
            Ok(()) => "success",
            Err(ReconcileError::Cancelled) => "cancelled",
            Err(ReconcileError::Failed(_)) => "failure",
        };
        RECONCILER_CYCLES
            .with_label_values(&[self.inner.name(), outcome])
            .inc();
        result
    }
}
