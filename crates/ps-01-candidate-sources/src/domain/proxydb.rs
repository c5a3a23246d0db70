//! Wire types of the proxydb.net listing endpoint.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared_types::{Candidate, CandidateError, Protocol};

/// Origin label stamped on every proxydb candidate.
pub const PROXYDB_ORIGIN: &str = "proxydb";

/// Request body for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyDbQuery {
    pub protocols: Vec<String>,
    /// Anonymity levels; 1 through 4 covers every listing.
    pub anonlvls: Vec<u8>,
    pub offset: usize,
}

impl ProxyDbQuery {
    /// Query for every supported protocol at every anonymity level.
    pub fn all(offset: usize) -> Self {
        Self {
            protocols: Protocol::ALL.iter().map(|p| p.as_str().to_string()).collect(),
            anonlvls: vec![1, 2, 3, 4],
            offset,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyDbPage {
    #[serde(default)]
    pub proxies: Vec<ProxyDbEntry>,
    #[serde(default)]
    pub total_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyDbEntry {
    pub ip: String,
    pub port: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ProxyDbEntry {
    /// Normalize the listing; unknown protocol types are rejected.
    pub fn to_candidate(&self) -> Result<Candidate, CandidateError> {
        Protocol::from_str(&self.kind)?;
        Candidate::parse(&format!("{}:{}", self.ip, self.port), PROXYDB_ORIGIN)
    }
}
