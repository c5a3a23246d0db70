//! # Plain-text Feeds
//!
//! Both text formats share the same poll: download, split into lines,
//! normalize, push. They differ only in the line parser.

use async_trait::async_trait;
use reqwest::Url;
use shared_types::{Candidate, CandidateError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters::http::HttpFetcher;
use crate::domain::errors::SourceError;
use crate::domain::lines::{parse_feed, parse_host_port_line, parse_proxy_url_line};
use crate::emitter::PageEmitter;
use crate::ports::CandidateProvider;

type LineParser = fn(&str, &str) -> Result<Candidate, CandidateError>;

/// Line format of a text feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// `host[:port]` per line.
    HostPort,
    /// `scheme://host:port` per line.
    ProxyUrl,
}

impl LineFormat {
    fn parser(self) -> LineParser {
        match self {
            LineFormat::HostPort => parse_host_port_line,
            LineFormat::ProxyUrl => parse_proxy_url_line,
        }
    }
}

/// A downloadable list of proxies, one per line.
///
/// Candidates carry the feed URL's host as their origin.
#[derive(Debug, Clone)]
pub struct TextListProvider {
    url: String,
    origin: String,
    format: LineFormat,
    http: HttpFetcher,
}

impl TextListProvider {
    pub fn new(url: &str, format: LineFormat, http: HttpFetcher) -> Result<Self, SourceError> {
        let parsed = Url::parse(url).map_err(|e| SourceError::InvalidSource(format!("{url}: {e}")))?;
        let origin = parsed
            .host_str()
            .ok_or_else(|| SourceError::InvalidSource(format!("{url}: missing host")))?
            .to_string();
        Ok(Self {
            url: url.to_string(),
            origin,
            format,
            http,
        })
    }

    pub fn host_port(url: &str, http: HttpFetcher) -> Result<Self, SourceError> {
        Self::new(url, LineFormat::HostPort, http)
    }

    pub fn proxy_url(url: &str, http: HttpFetcher) -> Result<Self, SourceError> {
        Self::new(url, LineFormat::ProxyUrl, http)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn format(&self) -> LineFormat {
        self.format
    }
}

#[async_trait]
impl CandidateProvider for TextListProvider {
    fn name(&self) -> &str {
        &self.url
    }

    async fn collect(
        &self,
        emitter: &mut PageEmitter<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        let body = self.http.get_text(&self.url, cancel).await?;
        let feed = parse_feed(&body, &self.origin, self.format.parser());

        for (line, err) in &feed.rejected {
            warn!(source = %self.url, %line, error = %err, "skipping malformed feed line");
        }
        debug!(
            source = %self.url,
            accepted = feed.candidates.len(),
            rejected = feed.rejected.len(),
            "feed downloaded"
        );

        for candidate in feed.candidates {
            emitter.push(candidate).await?;
        }
        Ok(())
    }
}
