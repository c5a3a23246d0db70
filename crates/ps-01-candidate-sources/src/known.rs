//! Default public feeds and construction of providers from declarative specs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapters::http::HttpFetcher;
use crate::adapters::proxydb::{ProxyDbProvider, PROXYDB_URL};
use crate::adapters::text_list::TextListProvider;
use crate::domain::errors::SourceError;
use crate::ports::CandidateProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One `host[:port]` per line.
    HostPortList,
    /// One `scheme://host:port` per line.
    UrlList,
    /// The paginated proxydb.net JSON listing.
    ProxyDb,
}

/// A feed as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    /// Required for list kinds; proxydb falls back to its public endpoint.
    #[serde(default)]
    pub url: Option<String>,
}

impl SourceSpec {
    pub fn host_port(url: &str) -> Self {
        Self {
            kind: SourceKind::HostPortList,
            url: Some(url.to_string()),
        }
    }

    pub fn url_list(url: &str) -> Self {
        Self {
            kind: SourceKind::UrlList,
            url: Some(url.to_string()),
        }
    }

    pub fn proxydb() -> Self {
        Self {
            kind: SourceKind::ProxyDb,
            url: None,
        }
    }

    pub fn build(&self, http: HttpFetcher) -> Result<Arc<dyn CandidateProvider>, SourceError> {
        let provider: Arc<dyn CandidateProvider> = match self.kind {
            SourceKind::HostPortList => Arc::new(TextListProvider::host_port(self.required_url()?, http)?),
            SourceKind::UrlList => Arc::new(TextListProvider::proxy_url(self.required_url()?, http)?),
            SourceKind::ProxyDb => Arc::new(ProxyDbProvider::with_url(
                self.url.as_deref().unwrap_or(PROXYDB_URL),
                http,
            )),
        };
        Ok(provider)
    }

    fn required_url(&self) -> Result<&str, SourceError> {
        self.url
            .as_deref()
            .ok_or_else(|| SourceError::InvalidSource(format!("{:?} source needs a url", self.kind)))
    }
}

const URL_LISTS: [&str; 2] = [
    "https://api.proxyscrape.com/v4/free-proxy-list/get?request=display_proxies&proxy_format=protocolipport&format=text",
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/all/data.txt",
];

const HOST_PORT_LISTS: [&str; 8] = [
    "https://www.proxy-list.download/api/v1/get?type=http",
    "https://www.proxy-list.download/api/v1/get?type=https",
    "https://www.proxy-list.download/api/v1/get?type=socks4",
    "https://www.proxy-list.download/api/v1/get?type=socks5",
    "https://vakhov.github.io/fresh-proxy-list/http.txt",
    "https://vakhov.github.io/fresh-proxy-list/https.txt",
    "https://vakhov.github.io/fresh-proxy-list/socks4.txt",
    "https://vakhov.github.io/fresh-proxy-list/socks5.txt",
];

/// The default public feed set.
pub fn known_sources() -> Vec<SourceSpec> {
    URL_LISTS
        .iter()
        .map(|url| SourceSpec::url_list(url))
        .chain(HOST_PORT_LISTS.iter().map(|url| SourceSpec::host_port(url)))
        .chain(std::iter::once(SourceSpec::proxydb()))
        .collect()
}
