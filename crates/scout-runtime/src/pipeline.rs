//! # Pipeline Wiring
//!
//! ```text
//! feeds (reconciled) ─Vec<Candidate>─→ WindowedBatcher ─→ UniqueFilter ─┬─→ flatten ─→ ProxySink        (stream)
//!                                                                        └─→ feeder ─→ CandidateStore
//!                                                                                     ↑
//!                                                         BulkTestCycle (reconciled) ─┘                 (bulk)
//! ```
//!
//! Every task observes the same root token. Cancelling it drains the stages
//! front to back; [`Pipeline::join`] returns once all of them have exited.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use shared_types::Candidate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ps_01_candidate_sources::{CandidateProvider, HttpFetcher, ProviderTask};
use ps_02_dedup_gate::{DedupGate, InMemoryKVStore, KeyValueStore, ProcessingGate};
use ps_03_proxy_prober::{HttpProbeTransport, Prober, ProxyProber, TracingProbeObserver};
use ps_04_proxy_sink::{
    BulkTestCycle, CandidateStore, InMemoryCandidateStore, JsonLinesResultStore, ProxySink,
    ResultStore, SinkDependencies, SinkStatsSnapshot,
};
use ps_05_reconciler::{
    ConstantBackoff, ExponentialBackoffConfig, ReconcileCycleState, Reconciler,
};
use ps_06_stream_utils::{flatten, UniqueFilter, WindowedBatcher};

use crate::config::{Mode, ScoutConfig};
use crate::metered::{
    MeteredGate, MeteredKVStore, MeteredReconcile, MeteredResultStore, MetricsProbeObserver,
};

/// The ports a pipeline runs against.
pub struct PipelineParts {
    pub providers: Vec<Arc<dyn CandidateProvider>>,
    pub gate: Arc<dyn ProcessingGate>,
    pub prober: Arc<dyn Prober>,
    pub results: Arc<dyn ResultStore>,
    /// Only consulted in bulk mode.
    pub candidates: Arc<dyn CandidateStore>,
}

/// Final bookkeeping of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub sink: Option<SinkStatsSnapshot>,
    pub bulk: Option<ReconcileCycleState>,
    pub sources: Vec<(String, ReconcileCycleState)>,
    /// Candidates written to the candidate store (bulk mode).
    pub fed: usize,
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

/// Build the production ports described by `config`.
pub async fn build_parts(config: &ScoutConfig) -> Result<PipelineParts> {
    let kv = open_dedup_store(config)?;
    let gate: Arc<dyn ProcessingGate> = Arc::new(MeteredGate::new(Arc::new(DedupGate::new(
        MeteredKVStore::new(kv),
    ))));

    let prober_config = config.prober_config();
    let transport = Arc::new(HttpProbeTransport::from_config(&prober_config));
    let observer = Arc::new(MetricsProbeObserver::new(Arc::new(TracingProbeObserver)));
    let prober: Arc<dyn Prober> =
        Arc::new(ProxyProber::new(transport, prober_config).with_observer(observer));

    let results = JsonLinesResultStore::open(&config.results.path)
        .await
        .with_context(|| format!("opening result file {}", config.results.path.display()))?;
    let results: Arc<dyn ResultStore> = Arc::new(MeteredResultStore::new(Arc::new(results)));

    let candidates: Arc<dyn CandidateStore> = Arc::new(InMemoryCandidateStore::new(
        Duration::from_secs(config.bulk.retry_interval_secs),
    ));

    let http = HttpFetcher::with_defaults()
        .context("building feed HTTP client")?
        .with_retry(
            ExponentialBackoffConfig::default(),
            config.sources.max_rate_limit_retries,
        );
    let providers = config
        .sources
        .specs()
        .iter()
        .map(|spec| {
            spec.build(http.clone())
                .with_context(|| format!("configuring source {spec:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PipelineParts {
        providers,
        gate,
        prober,
        results,
        candidates,
    })
}

fn open_dedup_store(config: &ScoutConfig) -> Result<Arc<dyn KeyValueStore>> {
    match &config.dedup.path {
        None => {
            warn!("dedup.path not set, processed marks will not survive a restart");
            Ok(Arc::new(InMemoryKVStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        Some(path) => {
            let store = ps_02_dedup_gate::RocksDbStore::open_default(path)
                .with_context(|| format!("opening dedup store at {}", path.display()))?;
            info!(path = %path.display(), "dedup store opened");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        Some(path) => anyhow::bail!(
            "dedup.path {} needs the rocksdb feature",
            path.display()
        ),
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Running pipeline tasks.
pub struct Pipeline {
    sources: Vec<(String, JoinHandle<ReconcileCycleState>)>,
    stages: Vec<JoinHandle<()>>,
    sink: Option<ProxySink>,
    feeder: Option<JoinHandle<usize>>,
    bulk: Option<JoinHandle<ReconcileCycleState>>,
}

impl Pipeline {
    /// Spawn every stage for `config.mode`.
    pub fn start(config: &ScoutConfig, parts: PipelineParts, cancel: CancellationToken) -> Self {
        let capacity = config.pipeline.channel_capacity.max(1);
        let (raw_tx, raw_rx) = mpsc::channel::<Vec<Candidate>>(capacity);

        let sources = parts
            .providers
            .into_iter()
            .map(|provider| {
                let name = provider.name().to_string();
                let task = MeteredReconcile::new(Arc::new(ProviderTask::new(provider, raw_tx.clone())));
                let handle = Reconciler::new(Arc::new(task))
                    .with_fail_backoff(ConstantBackoff::new(Duration::from_secs(
                        config.sources.fail_interval_secs,
                    )))
                    .with_wait_backoff(ConstantBackoff::new(Duration::from_secs(
                        config.sources.wait_interval_secs,
                    )))
                    .spawn(cancel.clone());
                (name, handle)
            })
            .collect::<Vec<_>>();
        drop(raw_tx);

        let (batched_tx, batched_rx) = mpsc::channel(capacity);
        let (unique_tx, unique_rx) = mpsc::channel(capacity);
        let mut stages = vec![
            tokio::spawn(
                WindowedBatcher::new(
                    config.pipeline.batch_size,
                    Duration::from_millis(config.pipeline.flush_interval_ms),
                )
                .run(cancel.clone(), raw_rx, batched_tx),
            ),
            tokio::spawn(
                UniqueFilter::new(Duration::from_secs(config.pipeline.unique_window_secs)).run(
                    cancel.clone(),
                    batched_rx,
                    unique_tx,
                    |c: &Candidate| (c.ip(), c.port()),
                ),
            ),
        ];

        let mut pipeline = Self {
            sources,
            stages: Vec::new(),
            sink: None,
            feeder: None,
            bulk: None,
        };

        match config.mode {
            Mode::Stream => {
                let (candidate_tx, candidate_rx) = mpsc::channel(capacity);
                stages.push(tokio::spawn(flatten(cancel.clone(), unique_rx, candidate_tx)));
                let deps = SinkDependencies {
                    gate: parts.gate,
                    prober: parts.prober,
                    results: parts.results,
                };
                pipeline.sink = Some(ProxySink::start(
                    config.sink_config(),
                    deps,
                    candidate_rx,
                    cancel.clone(),
                ));
            }
            Mode::Bulk => {
                pipeline.feeder = Some(tokio::spawn(feed_candidate_store(
                    cancel.clone(),
                    unique_rx,
                    Arc::clone(&parts.candidates),
                )));
                let cycle = BulkTestCycle::new(
                    config.bulk_config(),
                    parts.candidates,
                    parts.prober,
                    parts.results,
                );
                pipeline.bulk = Some(
                    Reconciler::new(Arc::new(MeteredReconcile::new(Arc::new(cycle))))
                        .with_fail_backoff(ConstantBackoff::new(Duration::from_secs(
                            config.bulk.fail_interval_secs,
                        )))
                        .with_wait_backoff(ConstantBackoff::new(Duration::from_secs(
                            config.bulk.wait_interval_secs,
                        )))
                        .spawn(cancel),
                );
            }
        }

        pipeline.stages = stages;
        info!(
            mode = ?config.mode,
            sources = pipeline.sources.len(),
            "pipeline started"
        );
        pipeline
    }

    /// Wait for every task to exit. Call after cancelling the root token.
    pub async fn join(self) -> RunSummary {
        let mut summary = RunSummary::default();

        for (name, handle) in self.sources {
            match handle.await {
                Ok(state) => summary.sources.push((name, state)),
                Err(err) => error!(source = %name, error = %err, "source task panicked"),
            }
        }
        for handle in self.stages {
            if let Err(err) = handle.await {
                error!(error = %err, "stream stage panicked");
            }
        }
        if let Some(sink) = self.sink {
            summary.sink = Some(sink.join().await);
        }
        if let Some(feeder) = self.feeder {
            match feeder.await {
                Ok(fed) => summary.fed = fed,
                Err(err) => error!(error = %err, "candidate feeder panicked"),
            }
        }
        if let Some(bulk) = self.bulk {
            match bulk.await {
                Ok(state) => summary.bulk = Some(state),
                Err(err) => error!(error = %err, "bulk reconciler panicked"),
            }
        }
        summary
    }
}

/// Upsert every candidate page into `store` until upstream closes.
async fn feed_candidate_store(
    cancel: CancellationToken,
    mut from: mpsc::Receiver<Vec<Candidate>>,
    store: Arc<dyn CandidateStore>,
) -> usize {
    let mut fed = 0;
    loop {
        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            page = from.recv() => match page {
                Some(page) => page,
                None => break,
            },
        };
        for candidate in &page {
            match store.upsert_candidate(candidate).await {
                Ok(()) => fed += 1,
                Err(err) => warn!(proxy = %candidate, error = %err, "candidate upsert failed"),
            }
        }
    }
    info!(fed, "candidate feeder stopped");
    fed
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use async_trait::async_trait;
    use ps_01_candidate_sources::{PageEmitter, SourceError};
    use ps_02_dedup_gate::DedupGate;
    use ps_03_proxy_prober::testing::{ProtocolScript, ScriptedTransport};
    use ps_03_proxy_prober::ProberConfig;
    use ps_04_proxy_sink::InMemoryResultStore;
    use shared_types::Protocol;

    use super::*;

    struct StaticFeed(Vec<Candidate>);

    #[async_trait]
    impl CandidateProvider for StaticFeed {
        fn name(&self) -> &str {
            "static"
        }

        async fn collect(
            &self,
            emitter: &mut PageEmitter<'_>,
            _cancel: &CancellationToken,
        ) -> Result<(), SourceError> {
            for candidate in &self.0 {
                emitter.push(candidate.clone()).await?;
            }
            Ok(())
        }
    }

    fn candidate(last: u8) -> Candidate {
        Candidate::new(Ipv4Addr::new(203, 0, 113, last), 8080, "static")
    }

    fn test_config(mode: Mode) -> ScoutConfig {
        let mut config = ScoutConfig::default();
        config.mode = mode;
        config.sink.workers = 2;
        config.pipeline.flush_interval_ms = 10;
        config.bulk.wait_interval_secs = 3600;
        config
    }

    fn parts(feed: Vec<Candidate>, results: Arc<InMemoryResultStore>) -> PipelineParts {
        let transport =
            Arc::new(ScriptedTransport::new().script(Protocol::Http, ProtocolScript::working()));
        let prober = ProxyProber::new(transport, ProberConfig::for_testing());
        PipelineParts {
            providers: vec![Arc::new(StaticFeed(feed))],
            gate: Arc::new(DedupGate::new(InMemoryKVStore::new())),
            prober: Arc::new(prober),
            results,
            candidates: Arc::new(InMemoryCandidateStore::default()),
        }
    }

    async fn wait_for_records(results: &InMemoryResultStore, n: usize) {
        for _ in 0..500 {
            if results.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} records, found {}", results.len());
    }

    #[tokio::test]
    async fn test_stream_mode_end_to_end() {
        let results = Arc::new(InMemoryResultStore::new());
        let feed = vec![candidate(5), candidate(6), candidate(5)];
        let cancel = CancellationToken::new();
        let pipeline = Pipeline::start(
            &test_config(Mode::Stream),
            parts(feed, Arc::clone(&results)),
            cancel.clone(),
        );

        wait_for_records(&results, 2).await;
        cancel.cancel();
        let summary = pipeline.join().await;

        let sink = summary.sink.unwrap();
        assert_eq!(sink.received, 2);
        assert_eq!(sink.persisted, 2);
        assert_eq!(summary.sources.len(), 1);
        assert!(results.records().iter().all(|r| r.protocol == Protocol::Http));
    }

    #[tokio::test]
    async fn test_bulk_mode_end_to_end() {
        let results = Arc::new(InMemoryResultStore::new());
        let feed = vec![candidate(7), candidate(8)];
        let cancel = CancellationToken::new();
        let mut config = test_config(Mode::Bulk);
        config.bulk.wait_interval_secs = 1;
        let pipeline = Pipeline::start(&config, parts(feed, Arc::clone(&results)), cancel.clone());

        wait_for_records(&results, 2).await;
        cancel.cancel();
        let summary = pipeline.join().await;

        assert!(summary.sink.is_none());
        assert_eq!(summary.fed, 2);
        assert!(summary.bulk.unwrap().total_successes >= 1);
    }
}
