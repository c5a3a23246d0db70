//! # Feed Line Parsing
//!
//! Text feeds come in two shapes: bare `host[:port]` lines and
//! `scheme://host:port` lines. Blank lines are skipped; anything that fails
//! normalization is rejected and reported to the caller.

use std::str::FromStr;

use shared_types::{Candidate, CandidateError, Protocol};

/// Parse one `host[:port]` line.
pub fn parse_host_port_line(line: &str, origin: &str) -> Result<Candidate, CandidateError> {
    Candidate::parse(line.trim(), origin)
}

/// Parse one `scheme://[user@]host[:port][/path]` line.
///
/// The scheme must be a supported protocol label. A missing port becomes `0`,
/// as for bare lines.
pub fn parse_proxy_url_line(line: &str, origin: &str) -> Result<Candidate, CandidateError> {
    let line = line.trim();
    let (scheme, rest) = line
        .split_once("://")
        .ok_or_else(|| CandidateError::MalformedHost(line.to_string()))?;
    Protocol::from_str(scheme)?;

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);
    Candidate::parse(host_port, origin)
}

/// Candidates accepted from a feed body, with the rejected lines.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub candidates: Vec<Candidate>,
    pub rejected: Vec<(String, CandidateError)>,
}

/// Apply `parse` to every non-blank line of `body`.
pub fn parse_feed<F>(body: &str, origin: &str, parse: F) -> ParsedFeed
where
    F: Fn(&str, &str) -> Result<Candidate, CandidateError>,
{
    let mut feed = ParsedFeed::default();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse(line, origin) {
            Ok(candidate) => feed.candidates.push(candidate),
            Err(err) => feed.rejected.push((line.to_string(), err)),
        }
    }
    feed
}
