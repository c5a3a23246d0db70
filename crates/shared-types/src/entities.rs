//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Discovery**: [`Candidate`], host:port normalization
//! - **Probing**: [`Protocol`] and its priority table
//! - **Persistence**: [`TestRecord`]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CandidateError;

// =============================================================================
// CLUSTER A: DISCOVERY
// =============================================================================

/// An untested `ip:port` emitted by a feed, tagged with the feed it came from.
///
/// Equality and hashing consider only `ip` and `port`; `origin` is metadata.
/// Two feeds reporting the same relay therefore produce equal candidates and
/// collide in every dedup structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    ip: Ipv4Addr,
    port: u16,
    origin: String,
}

impl Candidate {
    /// Create a candidate from an already-validated address.
    pub fn new(ip: Ipv4Addr, port: u16, origin: impl Into<String>) -> Self {
        Self {
            ip,
            port,
            origin: origin.into(),
        }
    }

    /// Normalize raw `host[:port]` feed input into a candidate.
    ///
    /// See [`normalize_host_port`] for the accepted grammar.
    pub fn parse(raw: &str, origin: impl Into<String>) -> Result<Self, CandidateError> {
        let (ip, port) = normalize_host_port(raw)?;
        Ok(Self::new(ip, port, origin))
    }

    /// Relay address.
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Relay port. `0` when the feed did not carry one.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Label of the feed that produced this candidate.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Canonical identity key, `"ip:port"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Identity key as bytes, the dedup store key format.
    pub fn key_bytes(&self) -> Vec<u8> {
        self.key().into_bytes()
    }

    /// Socket address of the relay.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from((self.ip, self.port))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip && self.port == other.port
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ip.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Normalize raw `host[:port]` input.
///
/// - The input is split on its last colon; a missing port becomes `0`.
/// - The host must have exactly four dot-separated decimal parts. Each part is
///   re-serialized in canonical form (`"010"` becomes `"10"`) and the joined
///   result must parse as an IPv4 address.
/// - The port must be an integer in `0..=65535`.
pub fn normalize_host_port(raw: &str) -> Result<(Ipv4Addr, u16), CandidateError> {
    let (host, port) = match raw.rfind(':') {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    };

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() != 4 {
        return Err(CandidateError::MalformedHost(host.to_string()));
    }

    let mut canonical = Vec::with_capacity(4);
    for part in parts {
        let value: u64 = part
            .parse()
            .map_err(|_| CandidateError::InvalidOctet(part.to_string()))?;
        canonical.push(value.to_string());
    }
    let joined = canonical.join(".");
    let ip: Ipv4Addr = joined
        .parse()
        .map_err(|_| CandidateError::InvalidAddress(joined.clone()))?;

    let port = match port {
        None => 0,
        Some(raw_port) => raw_port
            .parse::<u32>()
            .ok()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| CandidateError::InvalidPort(raw_port.to_string()))?,
    };

    Ok((ip, port))
}

// =============================================================================
// CLUSTER B: PROBING
// =============================================================================

/// Wire protocols a relay may speak.
///
/// Declaration order is the enumeration order used for deterministic
/// tie-breaks; [`Protocol::PRIORITY`] is the fallback selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP forward proxy.
    Http,
    /// HTTP proxy tunnelling TLS via CONNECT.
    Https,
    /// SOCKS4, client-side name resolution.
    Socks4,
    /// SOCKS4a, proxy-side name resolution.
    Socks4a,
    /// SOCKS5.
    Socks5,
}

impl Protocol {
    /// Every protocol, in enumeration order.
    pub const ALL: [Protocol; 5] = [
        Protocol::Http,
        Protocol::Https,
        Protocol::Socks4,
        Protocol::Socks4a,
        Protocol::Socks5,
    ];

    /// Fallback selection order, most preferred first.
    pub const PRIORITY: [Protocol; 5] = [
        Protocol::Socks5,
        Protocol::Socks4a,
        Protocol::Socks4,
        Protocol::Https,
        Protocol::Http,
    ];

    /// Position in [`Protocol::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Protocol::Http => 0,
            Protocol::Https => 1,
            Protocol::Socks4 => 2,
            Protocol::Socks4a => 3,
            Protocol::Socks5 => 4,
        }
    }

    /// Lowercase label used in records and proxy URLs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Socks4 => "socks4",
            Protocol::Socks4a => "socks4a",
            Protocol::Socks5 => "socks5",
        }
    }

    /// True for the SOCKS family.
    pub const fn is_socks(self) -> bool {
        matches!(self, Protocol::Socks4 | Protocol::Socks4a | Protocol::Socks5)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = CandidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "socks4" => Ok(Protocol::Socks4),
            "socks4a" => Ok(Protocol::Socks4a),
            "socks5" => Ok(Protocol::Socks5),
            _ => Err(CandidateError::UnsupportedProtocol(s.to_string())),
        }
    }
}

// =============================================================================
// CLUSTER C: PERSISTENCE
// =============================================================================

/// One validated relay, as written to the result store.
///
/// Upsert key: `(ip, port, protocol, tested_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub tested_at: DateTime<Utc>,
    pub websocket_supported: bool,
    /// `!exposes_ip` of the selected probe.
    pub anonymous: bool,
    pub fetch_succeeded: bool,
    /// Connectivity latency of the selected protocol.
    #[serde(rename = "delay_ms", with = "duration_ms")]
    pub delay: Duration,
    /// Origin label of the candidate.
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Upsert key of a [`TestRecord`].
pub type RecordKey = (String, u16, Protocol, DateTime<Utc>);

impl TestRecord {
    /// Key under which this record is upserted.
    pub fn record_key(&self) -> RecordKey {
        (self.ip.clone(), self.port, self.protocol, self.tested_at)
    }
}

/// Serde helpers storing a [`Duration`] as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
