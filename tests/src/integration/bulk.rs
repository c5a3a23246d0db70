//! # Bulk-Mode Flows
//!
//! Feed poll → candidate store → bulk test cycle → result store, with the
//! cycle driven once directly and once under a reconciler.

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use ps_01_candidate_sources::ProviderTask;
    use ps_03_proxy_prober::{BestResult, ProbeError, Prober};
    use ps_04_proxy_sink::{
        BulkConfig, BulkTestCycle, CandidateStore, InMemoryCandidateStore, InMemoryResultStore,
    };
    use ps_05_reconciler::{ConstantBackoff, Reconciler};
    use shared_types::{Candidate, Protocol};
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    use crate::integration::{http_only_prober, StaticFeed};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Relays ending in `.13` never answer; everything else is delegated.
    struct PickyProber {
        inner: Arc<dyn Prober>,
    }

    #[async_trait]
    impl Prober for PickyProber {
        async fn probe(
            &self,
            candidate: &Candidate,
            cancel: &CancellationToken,
        ) -> Result<BestResult, ProbeError> {
            if candidate.ip().octets()[3] == 13 {
                return Err(ProbeError::DeadlineExceeded);
            }
            self.inner.probe(candidate, cancel).await
        }
    }

    fn relay(last_octet: u8) -> Candidate {
        Candidate::new(Ipv4Addr::new(198, 51, 100, last_octet), 3128, "feedB")
    }

    fn config() -> BulkConfig {
        BulkConfig {
            page_size: 2,
            max_concurrency: 2,
            probe_timeout: Duration::from_secs(5),
        }
    }

    /// Drain one feed poll into `store`, as the runtime's feeder does.
    async fn feed_store(feed: StaticFeed, store: &InMemoryCandidateStore) {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        ProviderTask::new(Arc::new(feed), tx)
            .poll(&cancel)
            .await
            .unwrap();
        while let Some(page) = rx.recv().await {
            for candidate in page {
                store.upsert_candidate(&candidate).await.unwrap();
            }
        }
    }

    // =============================================================================
    // TEST GROUP 1: Single cycle
    // =============================================================================

    #[tokio::test]
    async fn test_cycle_tests_every_pending_row_once() {
        let store = Arc::new(InMemoryCandidateStore::new(Duration::from_secs(3600)));
        feed_store(
            StaticFeed::new("feedB", vec![relay(11), relay(12), relay(13), relay(11)]),
            &store,
        )
        .await;
        assert_eq!(store.len(), 3);

        let results = Arc::new(InMemoryResultStore::new());
        let (_transport, inner) = http_only_prober();
        let cycle = BulkTestCycle::new(
            config(),
            store.clone(),
            Arc::new(PickyProber { inner }),
            results.clone(),
        );

        let report = cycle.run_cycle(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.pending, 3);
        assert_eq!(report.probed, 3);
        assert_eq!(report.succeeded, 2);

        let records = results.records();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.protocol == Protocol::Http && r.provider == "feedB"));
        let ok = store.row(&relay(11)).unwrap();
        assert!(ok.last_tested.is_some());
        assert_eq!(ok.last_error, None);
        let dead = store.row(&relay(13)).unwrap();
        assert!(dead.last_tested.is_some());
        assert_eq!(
            dead.last_error.as_deref(),
            Some("probe deadline exceeded for all protocols")
        );

        // Every row was tested inside the retry interval.
        let again = cycle.run_cycle(&CancellationToken::new()).await.unwrap();
        assert_eq!(again.pending, 0);
        assert_eq!(results.len(), 2);
    }

    // =============================================================================
    // TEST GROUP 2: Under a reconciler
    // =============================================================================

    #[tokio::test]
    async fn test_reconciler_drives_cycles_until_cancelled() {
        let store = Arc::new(InMemoryCandidateStore::new(Duration::from_secs(3600)));
        feed_store(StaticFeed::new("feedB", vec![relay(21), relay(22)]), &store).await;

        let results = Arc::new(InMemoryResultStore::new());
        let (transport, prober) = http_only_prober();
        let cycle = BulkTestCycle::new(config(), store.clone(), prober, results.clone());

        let cancel = CancellationToken::new();
        let handle = Reconciler::new(Arc::new(cycle))
            .with_fail_backoff(ConstantBackoff::new(Duration::from_millis(10)))
            .with_wait_backoff(ConstantBackoff::new(Duration::from_millis(10)))
            .spawn(cancel.clone());

        timeout(Duration::from_secs(5), async {
            while results.len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let state = timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(state.total_successes >= 2);
        assert_eq!(state.total_failures, 0);
        // Tested rows stay out of later cycles until the retry interval.
        assert_eq!(transport.calls(Protocol::Http).connectivity, 2);
        assert_eq!(results.len(), 2);
    }
}
