//! # Rate-limit Aware Fetching
//!
//! Every feed request goes through [`fetch_with_retry`]: a `429` is retried
//! after the server's `Retry-After` hint, or after the next backoff delay when
//! the hint is missing. Any other status is returned to the caller untouched.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Request, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ps_05_reconciler::{
    sleep_or_cancel, Backoff, ExponentialBackoff, ExponentialBackoffConfig, LimitedBackoff,
};

use crate::domain::errors::SourceError;
use crate::domain::retry_after::parse_retry_after;

/// Per-request timeout of feed downloads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Rate-limit retries per request before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

pub const USER_AGENT: &str = concat!("proxy-scout/", env!("CARGO_PKG_VERSION"));

/// Execute `request`, retrying while the server answers `429`.
pub async fn fetch_with_retry(
    client: &Client,
    request: Request,
    backoff: &mut dyn Backoff,
    cancel: &CancellationToken,
) -> Result<Response, SourceError> {
    loop {
        let attempt = request
            .try_clone()
            .ok_or_else(|| SourceError::InvalidSource("request body is not replayable".into()))?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            res = client.execute(attempt) => res.map_err(|e| SourceError::Http(e.to_string()))?,
        };
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }

        let hinted = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let delay = match hinted {
            Some(delay) => delay,
            None => backoff.next_delay().ok_or(SourceError::RetryLimit)?,
        };

        debug!(
            url = %request.url(),
            delay_ms = delay.as_millis() as u64,
            hinted = hinted.is_some(),
            "rate limited, backing off"
        );
        if !sleep_or_cancel(delay, cancel).await {
            return Err(SourceError::Cancelled);
        }
    }
}

/// Shared HTTP client plus the rate-limit retry policy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: ExponentialBackoffConfig,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: ExponentialBackoffConfig::default(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Client with the default timeout and user agent.
    pub fn with_defaults() -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(Self::new(client))
    }

    pub fn with_retry(mut self, retry: ExponentialBackoffConfig, max_retries: u32) -> Self {
        self.retry = retry;
        self.max_retries = max_retries;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send `request` with a fresh backoff sequence and require a 2xx answer.
    pub async fn send(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, SourceError> {
        let mut backoff = LimitedBackoff::new(ExponentialBackoff::new(self.retry), self.max_retries);
        let response = fetch_with_retry(&self.client, request, &mut backoff, cancel).await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }
        Ok(response)
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String, SourceError> {
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| SourceError::InvalidSource(e.to_string()))?;
        let response = self.send(request, cancel).await?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            body = response.text() => body.map_err(|e| SourceError::Decode(e.to_string())),
        }
    }
}
