//! # Anonymity Checks
//!
//! Two independent signals mark a relay as exposing the requester:
//!
//! - a known leak header with a non-empty value, either echoed back by the
//!   diagnostic endpoint or present on the response itself;
//! - an IP-echo endpoint reporting an origin equal to the relay's own IP.

use std::net::Ipv4Addr;

use serde_json::Value;

/// Header names known to carry the true client IP. Compared case-insensitively.
pub const LEAK_HEADERS: [&str; 11] = [
    "X-Forwarded-For",
    "X-Real-IP",
    "Forwarded",
    "Client-IP",
    "Forwarded-For",
    "True-Client-IP",
    "CF-Connecting-IP",
    "Fastly-Client-Ip",
    "X-Cluster-Client-IP",
    "X-Forwarded",
    "Forwarded-For-Ip",
];

/// True if any `(name, value)` pair is a leak header with a non-empty value.
pub fn headers_expose_ip<'a, I>(headers: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers.into_iter().any(|(name, value)| {
        !value.trim().is_empty() && LEAK_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
    })
}

/// Extract the header map echoed in a diagnostic response body
/// (`{"headers": {"Name": "value", ...}}`). Non-string values are skipped.
pub fn echoed_headers(body: &Value) -> Vec<(String, String)> {
    body.get("headers")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Reported origin of an IP-echo response: `origin`, falling back to `ip`.
///
/// `None` when neither field holds a non-empty string, meaning the response
/// is not usable and the next endpoint should be tried.
pub fn reported_origin(body: &Value) -> Option<&str> {
    ["origin", "ip"]
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

/// True if any comma-separated part of `origin` equals `relay_ip` exactly.
pub fn origin_matches(origin: &str, relay_ip: Ipv4Addr) -> bool {
    let relay_ip = relay_ip.to_string();
    origin.split(',').any(|part| part.trim() == relay_ip)
}
