//! # Proxy Sink Worker Pool
//!
//! `N` symmetric workers share one receiver. Each pulls a candidate, gates,
//! probes, persists and marks it, then pulls the next. Workers exit when the
//! channel closes or the cancellation token fires.
//!
//! Gate calls are synchronous. With `offload_gate` they run on the blocking
//! pool so a disk-backed gate never stalls the async workers; otherwise they
//! run inline, which suits the in-memory gate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ps_02_dedup_gate::ProcessingGate;
use ps_03_proxy_prober::{ProbeError, Prober};
use shared_types::Candidate;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::config::SinkConfig;
use crate::domain::record::to_record;
use crate::domain::stats::{SinkStats, SinkStatsSnapshot};
use crate::ports::outbound::ResultStore;

/// Collaborators shared by every worker.
#[derive(Clone)]
pub struct SinkDependencies {
    pub gate: Arc<dyn ProcessingGate>,
    pub prober: Arc<dyn Prober>,
    pub results: Arc<dyn ResultStore>,
}

/// Running worker pool.
pub struct ProxySink {
    workers: Vec<JoinHandle<()>>,
    stats: Arc<SinkStats>,
}

impl ProxySink {
    /// Spawn `config.workers()` workers draining `input`.
    pub fn start(
        config: SinkConfig,
        deps: SinkDependencies,
        input: mpsc::Receiver<Candidate>,
        cancel: CancellationToken,
    ) -> Self {
        let input = Arc::new(Mutex::new(input));
        let stats = Arc::new(SinkStats::default());
        let worker = Arc::new(Worker {
            deps,
            window: config.freshness_window,
            offload_gate: config.offload_gate,
            stats: Arc::clone(&stats),
        });

        let workers = (0..config.workers())
            .map(|id| {
                let worker = Arc::clone(&worker);
                let input = Arc::clone(&input);
                let cancel = cancel.clone();
                tokio::spawn(async move { worker.run(id, &input, &cancel).await })
            })
            .collect();

        info!(
            workers = config.workers(),
            freshness_window_secs = config.freshness_window.as_secs(),
            offload_gate = config.offload_gate,
            "proxy sink started"
        );
        Self { workers, stats }
    }

    pub fn stats(&self) -> SinkStatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait until every worker has exited.
    pub async fn join(self) -> SinkStatsSnapshot {
        for handle in self.workers {
            if let Err(err) = handle.await {
                error!(error = %err, "sink worker panicked");
            }
        }
        let stats = self.stats.snapshot();
        info!(
            received = stats.received,
            skipped = stats.skipped,
            probed = stats.probed,
            persisted = stats.persisted,
            "proxy sink stopped"
        );
        stats
    }
}

struct Worker {
    deps: SinkDependencies,
    window: Duration,
    offload_gate: bool,
    stats: Arc<SinkStats>,
}

impl Worker {
    async fn run(&self, id: usize, input: &Mutex<mpsc::Receiver<Candidate>>, cancel: &CancellationToken) {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(worker = id, "worker shutting down");
                    return;
                }
                next = recv(input) => next,
            };
            let Some(candidate) = next else {
                debug!(worker = id, "input channel closed");
                return;
            };
            self.process_one(&candidate, cancel).await;
        }
    }

    async fn process_one(&self, candidate: &Candidate, cancel: &CancellationToken) {
        self.stats.record_received();
        if !self.should_process(candidate).await {
            self.stats.record_skipped();
            return;
        }

        match self.deps.prober.probe(candidate, cancel).await {
            Err(ProbeError::Cancelled) => {
                self.stats.record_cancelled();
                debug!(proxy = %candidate, "probe cancelled, not marking");
                return;
            }
            Err(err) => debug!(proxy = %candidate, error = %err, "probe failed"),
            Ok(best) if best.success() => {
                let record = to_record(candidate, &best, Utc::now());
                match self.deps.results.upsert(&record).await {
                    Ok(()) => self.stats.record_persisted(),
                    Err(err) => {
                        self.stats.record_store_error();
                        error!(proxy = %candidate, error = %err, "failed to persist test result");
                    }
                }
            }
            Ok(_) => {}
        }
        self.stats.record_probed();

        self.mark_processed(candidate).await;
        debug!(proxy = %candidate, "finished proxy");
    }

    async fn should_process(&self, candidate: &Candidate) -> bool {
        if !self.offload_gate {
            return self.deps.gate.should_process(candidate, self.window);
        }
        let gate = Arc::clone(&self.deps.gate);
        let owned = candidate.clone();
        let window = self.window;
        match tokio::task::spawn_blocking(move || gate.should_process(&owned, window)).await {
            Ok(fresh) => fresh,
            Err(err) => {
                // Same answer the gate gives on a store error.
                warn!(proxy = %candidate, error = %err, "gate lookup task failed");
                true
            }
        }
    }

    async fn mark_processed(&self, candidate: &Candidate) {
        let outcome = if self.offload_gate {
            let gate = Arc::clone(&self.deps.gate);
            let owned = candidate.clone();
            tokio::task::spawn_blocking(move || gate.mark_processed(&owned))
                .await
                .map_err(|err| err.to_string())
                .and_then(|marked| marked.map_err(|err| err.to_string()))
        } else {
            self.deps
                .gate
                .mark_processed(candidate)
                .map_err(|err| err.to_string())
        };
        if let Err(err) = outcome {
            self.stats.record_mark_error();
            warn!(proxy = %candidate, error = %err, "failed to mark processed");
        }
    }
}

async fn recv(input: &Mutex<mpsc::Receiver<Candidate>>) -> Option<Candidate> {
    input.lock().await.recv().await
}
