//! # Candidate Sources (ps-01)
//!
//! Public proxy-list feeds. Each feed is a [`CandidateProvider`]; wrapping it
//! in a [`ProviderTask`] lets the reconciler poll it on a cadence and push
//! normalized [`shared_types::Candidate`] pages downstream.
//!
//! ## Feeds
//!
//! | Provider | Format | Origin |
//! |----------|--------|--------|
//! | [`TextListProvider`] (`HostPort`) | `host[:port]` per line | feed URL host |
//! | [`TextListProvider`] (`ProxyUrl`) | `scheme://host:port` per line | feed URL host |
//! | [`ProxyDbProvider`] | paginated JSON POST | `proxydb` |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Normalized output | Only candidates that pass `Candidate::parse` are emitted |
//! | 2 | Bounded pages | Pages never exceed the emitter page size (256 default) |
//! | 3 | Polite retries | A `429` waits for `Retry-After` or the next backoff delay |
//! | 4 | Cancellable waits | Every wait and send races the cancellation token |

pub mod adapters;
pub mod domain;
pub mod emitter;
pub mod known;
pub mod ports;
pub mod service;

#[cfg(test)]
mod test_server;

pub use adapters::http::{
    fetch_with_retry, HttpFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_RETRIES, USER_AGENT,
};
pub use adapters::proxydb::{ProxyDbProvider, DEFAULT_PAGE_DELAY, PROXYDB_URL};
pub use adapters::text_list::{LineFormat, TextListProvider};
pub use domain::errors::SourceError;
pub use domain::lines::{parse_feed, parse_host_port_line, parse_proxy_url_line, ParsedFeed};
pub use domain::proxydb::{ProxyDbEntry, ProxyDbPage, ProxyDbQuery, PROXYDB_ORIGIN};
pub use domain::retry_after::parse_retry_after;
pub use emitter::{PageEmitter, DEFAULT_PAGE_SIZE};
pub use known::{known_sources, SourceKind, SourceSpec};
pub use ports::CandidateProvider;
pub use service::ProviderTask;
