//! # Provider Task
//!
//! Adapts a [`CandidateProvider`] to the scheduler: one reconcile cycle is
//! one full poll of the feed, with the trailing partial page flushed.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::Candidate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ps_05_reconciler::{Reconcile, ReconcileError};

use crate::domain::errors::SourceError;
use crate::emitter::{PageEmitter, DEFAULT_PAGE_SIZE};
use crate::ports::CandidateProvider;

pub struct ProviderTask {
    provider: Arc<dyn CandidateProvider>,
    pages: mpsc::Sender<Vec<Candidate>>,
    page_size: usize,
}

impl ProviderTask {
    pub fn new(provider: Arc<dyn CandidateProvider>, pages: mpsc::Sender<Vec<Candidate>>) -> Self {
        Self {
            provider,
            pages,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Poll once, returning how many candidates went downstream.
    pub async fn poll(&self, cancel: &CancellationToken) -> Result<usize, SourceError> {
        let mut emitter = PageEmitter::new(&self.pages, cancel, self.page_size);
        self.provider.collect(&mut emitter, cancel).await?;
        emitter.flush().await?;
        Ok(emitter.emitted())
    }
}

#[async_trait]
impl Reconcile for ProviderTask {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn reconcile(&self, cancel: &CancellationToken) -> Result<(), ReconcileError> {
        match self.poll(cancel).await {
            Ok(emitted) => {
                info!(source = %self.provider.name(), emitted, "source poll finished");
                Ok(())
            }
            // A closed sink means the pipeline is shutting down.
            Err(SourceError::Cancelled | SourceError::SinkClosed) => Err(ReconcileError::Cancelled),
            Err(err) => Err(ReconcileError::failed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FixedProvider {
        count: u8,
        fail: Option<SourceError>,
        polls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(count: u8) -> Self {
            Self {
                count,
                fail: None,
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CandidateProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn collect(
            &self,
            emitter: &mut PageEmitter<'_>,
            _cancel: &CancellationToken,
        ) -> Result<(), SourceError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            for n in 0..self.count {
                emitter
                    .push(Candidate::new(Ipv4Addr::new(192, 0, 2, n), 80, "fixed"))
                    .await?;
            }
            match &self.fail {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_poll_flushes_partial_page() {
        let (tx, mut rx) = mpsc::channel(8);
        let task = ProviderTask::new(Arc::new(FixedProvider::new(5)), tx).with_page_size(2);

        task.reconcile(&CancellationToken::new()).await.unwrap();

        let mut sizes = Vec::new();
        while let Ok(page) = rx.try_recv() {
            sizes.push(page.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(task.name(), "fixed");
    }

    #[tokio::test]
    async fn test_failure_maps_to_failed() {
        let (tx, _rx) = mpsc::channel(8);
        let mut provider = FixedProvider::new(0);
        provider.fail = Some(SourceError::Status(502));
        let task = ProviderTask::new(Arc::new(provider), tx);

        let err = task.reconcile(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, ReconcileError::Failed("unexpected status 502".into()));
    }

    #[tokio::test]
    async fn test_closed_sink_stops_scheduling() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let task = ProviderTask::new(Arc::new(FixedProvider::new(3)), tx).with_page_size(1);

        let err = task.reconcile(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, ReconcileError::Cancelled);
    }
}
