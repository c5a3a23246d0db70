//! # proxydb.net
//!
//! A paginated JSON listing. Pages are requested by offset until the
//! reported total is reached or a page comes back empty.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ps_05_reconciler::sleep_or_cancel;

use crate::adapters::http::HttpFetcher;
use crate::domain::errors::SourceError;
use crate::domain::proxydb::{ProxyDbPage, ProxyDbQuery};
use crate::emitter::PageEmitter;
use crate::ports::CandidateProvider;

pub const PROXYDB_URL: &str = "https://proxydb.net/list";

/// Pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProxyDbProvider {
    url: String,
    page_delay: Duration,
    http: HttpFetcher,
}

impl ProxyDbProvider {
    pub fn new(http: HttpFetcher) -> Self {
        Self::with_url(PROXYDB_URL, http)
    }

    pub fn with_url(url: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            page_delay: DEFAULT_PAGE_DELAY,
            http,
        }
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    async fn fetch_page(
        &self,
        offset: usize,
        cancel: &CancellationToken,
    ) -> Result<ProxyDbPage, SourceError> {
        let request = self
            .http
            .client()
            .post(&self.url)
            .json(&ProxyDbQuery::all(offset))
            .build()
            .map_err(|e| SourceError::InvalidSource(e.to_string()))?;
        let response = self.http.send(request, cancel).await?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            page = response.json::<ProxyDbPage>() => page.map_err(|e| SourceError::Decode(e.to_string())),
        }
    }
}

#[async_trait]
impl CandidateProvider for ProxyDbProvider {
    fn name(&self) -> &str {
        "proxydb"
    }

    async fn collect(
        &self,
        emitter: &mut PageEmitter<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        let mut offset = 0;
        loop {
            let page = self.fetch_page(offset, cancel).await?;
            if page.proxies.is_empty() {
                break;
            }
            offset += page.proxies.len();
            debug!(offset, total = page.total_count, "proxydb page received");

            for entry in &page.proxies {
                match entry.to_candidate() {
                    Ok(candidate) => emitter.push(candidate).await?,
                    Err(err) => {
                        warn!(ip = %entry.ip, port = entry.port, kind = %entry.kind, error = %err, "skipping proxydb entry")
                    }
                }
            }

            if offset >= page.total_count {
                break;
            }
            if !sleep_or_cancel(self.page_delay, cancel).await {
                return Err(SourceError::Cancelled);
            }
        }
        Ok(())
    }
}
