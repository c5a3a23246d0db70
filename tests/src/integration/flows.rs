//! # Stream-Mode Flows
//!
//! Feed poll → windowed batcher → uniqueness filter → flatten → proxy sink,
//! wired the way the runtime wires them but with scripted relays.
//!
//! ## Flow Tested:
//!
//! 1. **Feed → result file**: a candidate from feed `feedA` that answers
//!    HTTP anonymously lands in the JSON-lines store as one record.
//! 2. **Dedup across polls**: a candidate repeated inside the freshness
//!    window is skipped by the gate, and probed again after it.
//! 3. **Real text feed**: a `host:port` list served over HTTP reaches the sink.
//! 4. **Shutdown**: cancelling mid-probe drains the pipeline without marking.

use std::sync::Arc;
use std::time::Duration;

use ps_01_candidate_sources::ProviderTask;
use ps_02_dedup_gate::ProcessingGate;
use ps_03_proxy_prober::Prober;
use ps_04_proxy_sink::{ProxySink, ResultStore, SinkConfig, SinkDependencies};
use ps_06_stream_utils::{flatten, UniqueFilter, WindowedBatcher};
use shared_types::Candidate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Spawn the stream stages between `pages` and a fresh sink.
pub fn spawn_stream(
    pages: mpsc::Receiver<Vec<Candidate>>,
    unique_window: Duration,
    gate: Arc<dyn ProcessingGate>,
    prober: Arc<dyn Prober>,
    results: Arc<dyn ResultStore>,
    freshness_window: Duration,
    cancel: CancellationToken,
) -> ProxySink {
    let (batch_tx, batch_rx) = mpsc::channel(8);
    let (unique_tx, unique_rx) = mpsc::channel(8);
    let (candidate_tx, candidate_rx) = mpsc::channel(8);

    tokio::spawn(
        WindowedBatcher::new(100, Duration::from_millis(10)).run(cancel.clone(), pages, batch_tx),
    );
    tokio::spawn(UniqueFilter::new(unique_window).run(
        cancel.clone(),
        batch_rx,
        unique_tx,
        |c: &Candidate| (c.ip(), c.port()),
    ));
    tokio::spawn(flatten(cancel.clone(), unique_rx, candidate_tx));

    ProxySink::start(
        SinkConfig::new(2, freshness_window),
        SinkDependencies {
            gate,
            prober,
            results,
        },
        candidate_rx,
        cancel,
    )
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use ps_01_candidate_sources::{HttpFetcher, TextListProvider};
    use ps_02_dedup_gate::{DedupGate, InMemoryKVStore, ManualTimeSource};
    use ps_03_proxy_prober::testing::{ProtocolScript, ScriptedTransport};
    use ps_03_proxy_prober::{ProberConfig, ProxyProber};
    use ps_04_proxy_sink::{read_records, InMemoryResultStore, JsonLinesResultStore};
    use shared_types::Protocol;
    use tokio::time::timeout;

    use super::*;
    use crate::integration::{http_only_prober, serve_feed_once, StaticFeed};

    const WINDOW: Duration = Duration::from_secs(8 * 60 * 60);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type TestGate = DedupGate<Arc<InMemoryKVStore>, Arc<ManualTimeSource>>;

    fn gate() -> (Arc<ManualTimeSource>, Arc<TestGate>) {
        let clock = Arc::new(ManualTimeSource::new(1_000_000_000));
        let gate = Arc::new(DedupGate::with_clock(
            Arc::new(InMemoryKVStore::new()),
            Arc::clone(&clock),
        ));
        (clock, gate)
    }

    fn relay(a: u8, b: u8, c: u8, d: u8, port: u16) -> Candidate {
        Candidate::new(Ipv4Addr::new(a, b, c, d), port, "feedA")
    }

    /// Poll until `done` holds or a generous deadline passes.
    async fn wait_for(sink: &ProxySink, done: impl Fn(&ps_04_proxy_sink::SinkStatsSnapshot) -> bool) {
        timeout(Duration::from_secs(5), async {
            while !done(&sink.stats()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sink did not reach the expected state");
    }

    // =============================================================================
    // TEST GROUP 1: Feed to result file
    // =============================================================================

    #[tokio::test]
    async fn test_anonymous_http_relay_lands_in_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let results = Arc::new(JsonLinesResultStore::open(&path).await.unwrap());
        let (_clock, gate) = gate();
        let (transport, prober) = http_only_prober();
        let cancel = CancellationToken::new();

        let (pages_tx, pages_rx) = mpsc::channel(8);
        let sink = spawn_stream(
            pages_rx,
            Duration::from_secs(600),
            gate.clone(),
            prober,
            results,
            WINDOW,
            cancel.clone(),
        );

        let feed = StaticFeed::new(
            "feedA",
            vec![
                relay(203, 0, 113, 5, 8080),
                relay(203, 0, 113, 5, 8080),
                relay(198, 51, 100, 7, 3128),
            ],
        );
        let task = ProviderTask::new(Arc::new(feed), pages_tx);
        assert_eq!(task.poll(&cancel).await.unwrap(), 3);
        drop(task);

        let stats = timeout(Duration::from_secs(5), sink.join()).await.unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.persisted, 2);
        assert_eq!(transport.calls(Protocol::Http).connectivity, 2);

        let records = read_records(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        let record = records.iter().find(|r| r.ip == "203.0.113.5").unwrap();
        assert_eq!(record.port, 8080);
        assert_eq!(record.protocol, Protocol::Http);
        assert!(record.anonymous);
        assert!(record.fetch_succeeded);
        assert!(record.websocket_supported);
        assert_eq!(record.provider, "feedA");
        assert_eq!(record.error, None);
        assert!(gate
            .last_processed(&relay(203, 0, 113, 5, 8080))
            .unwrap()
            .is_some());
    }

    // =============================================================================
    // TEST GROUP 2: Dedup gate across polls
    // =============================================================================

    #[tokio::test]
    async fn test_repeat_is_gated_until_window_passes() {
        let results = Arc::new(InMemoryResultStore::new());
        let (clock, gate) = gate();
        let (transport, prober) = http_only_prober();
        let cancel = CancellationToken::new();

        let (pages_tx, pages_rx) = mpsc::channel(8);
        // A tiny uniqueness window leaves suppression to the gate.
        let sink = spawn_stream(
            pages_rx,
            Duration::from_millis(1),
            gate,
            prober,
            results.clone(),
            WINDOW,
            cancel.clone(),
        );
        let task = ProviderTask::new(
            Arc::new(StaticFeed::new("feedA", vec![relay(203, 0, 113, 5, 8080)])),
            pages_tx,
        );

        task.poll(&cancel).await.unwrap();
        wait_for(&sink, |s| s.persisted == 1).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        task.poll(&cancel).await.unwrap();
        wait_for(&sink, |s| s.skipped == 1).await;
        assert_eq!(transport.calls(Protocol::Http).connectivity, 1);

        clock.advance(WINDOW + Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.poll(&cancel).await.unwrap();
        drop(task);

        let stats = timeout(Duration::from_secs(5), sink.join()).await.unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.persisted, 2);
        assert_eq!(transport.calls(Protocol::Http).connectivity, 2);
        assert_eq!(results.len(), 2);
    }

    // =============================================================================
    // TEST GROUP 3: Text feed over HTTP
    // =============================================================================

    #[tokio::test]
    async fn test_host_port_feed_reaches_sink() {
        let addr = serve_feed_once("203.0.113.5:8080\nnot-a-proxy\n\n198.51.100.7:3128\n").await;
        let url = format!("http://{addr}/proxies.txt");
        let provider = TextListProvider::host_port(&url, HttpFetcher::with_defaults().unwrap())
            .unwrap();

        let results = Arc::new(InMemoryResultStore::new());
        let (_clock, gate) = gate();
        let (_transport, prober) = http_only_prober();
        let cancel = CancellationToken::new();
        let (pages_tx, pages_rx) = mpsc::channel(8);
        let sink = spawn_stream(
            pages_rx,
            Duration::from_secs(600),
            gate,
            prober,
            results.clone(),
            WINDOW,
            cancel.clone(),
        );

        let task = ProviderTask::new(Arc::new(provider), pages_tx);
        assert_eq!(task.poll(&cancel).await.unwrap(), 2);
        drop(task);

        let stats = timeout(Duration::from_secs(5), sink.join()).await.unwrap();
        assert_eq!(stats.persisted, 2);
        let mut records = results.records();
        records.sort_by(|a, b| a.ip.cmp(&b.ip));
        assert_eq!(records[0].ip, "198.51.100.7");
        assert_eq!(records[1].port, 8080);
        assert!(records.iter().all(|r| r.provider == "127.0.0.1"));
    }

    // =============================================================================
    // TEST GROUP 4: Shutdown
    // =============================================================================

    #[tokio::test]
    async fn test_cancel_mid_probe_drains_without_marking() {
        let transport = Arc::new(ScriptedTransport::new().script(
            Protocol::Http,
            ProtocolScript::working().with_connect_delay(Duration::from_secs(60)),
        ));
        let prober: Arc<dyn Prober> = Arc::new(ProxyProber::new(
            transport,
            ProberConfig {
                timeout: Duration::from_secs(120),
                ..ProberConfig::for_testing()
            },
        ));
        let results = Arc::new(InMemoryResultStore::new());
        let (_clock, gate) = gate();
        let cancel = CancellationToken::new();
        let (pages_tx, pages_rx) = mpsc::channel(8);
        let sink = spawn_stream(
            pages_rx,
            Duration::from_secs(600),
            gate.clone(),
            prober,
            results.clone(),
            WINDOW,
            cancel.clone(),
        );

        pages_tx.send(vec![relay(203, 0, 113, 9, 80)]).await.unwrap();
        wait_for(&sink, |s| s.received == 1).await;
        cancel.cancel();

        let stats = timeout(Duration::from_secs(5), sink.join()).await.unwrap();
        assert_eq!(stats.persisted, 0);
        assert!(results.is_empty());
        assert!(gate
            .last_processed(&relay(203, 0, 113, 9, 80))
            .unwrap()
            .is_none());
    }
}
