//! # Prober Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-candidate probe deadline.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts for the WebSocket and plain-GET sub-probes.
pub const SUB_PROBE_ATTEMPTS: u32 = 2;

/// Pause between sub-probe attempts.
pub const SUB_PROBE_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Default IP-echo endpoints, tried in order.
pub const DEFAULT_IP_ECHO_URLS: [&str; 3] = [
    "https://httpbin.org/ip",
    "https://api.ipify.org?format=json",
    "https://ifconfig.co/json",
];

/// How a fetch-probe response is judged successful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseMarker {
    /// A header named `name` (case-insensitive) has a value containing `needle`.
    HeaderContains { name: String, needle: String },
    /// The response body contains `needle`.
    BodyContains { needle: String },
    /// Any 2xx status.
    SuccessStatus,
}

impl ResponseMarker {
    pub fn matches(&self, response: &FetchResponse) -> bool {
        match self {
            ResponseMarker::HeaderContains { name, needle } => response
                .headers
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case(name) && v.contains(needle.as_str())),
            ResponseMarker::BodyContains { needle } => response.body.contains(needle.as_str()),
            ResponseMarker::SuccessStatus => (200..300).contains(&response.status),
        }
    }
}

impl Default for ResponseMarker {
    fn default() -> Self {
        ResponseMarker::HeaderContains {
            name: "X-Probe-Marker".into(),
            needle: "ok".into(),
        }
    }
}

/// Response observed by the fetch probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Endpoints and limits used by the prober.
#[derive(Debug, Clone, PartialEq)]
pub struct ProberConfig {
    /// Deadline shared by all protocol probes of one candidate.
    pub timeout: Duration,
    /// Connectivity target for HTTP and SOCKS variants. Echoes request headers.
    pub http_get_url: String,
    /// Connectivity target for HTTPS, reached through a CONNECT tunnel.
    pub https_ip_url: String,
    pub websocket_url: String,
    pub ip_echo_urls: Vec<String>,
    pub fetch_url: String,
    pub fetch_marker: ResponseMarker,
    pub user_agent: String,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            http_get_url: "http://httpbin.org/get".into(),
            https_ip_url: "https://httpbin.org/ip".into(),
            websocket_url: "ws://echo.websocket.org".into(),
            ip_echo_urls: DEFAULT_IP_ECHO_URLS.iter().map(|s| s.to_string()).collect(),
            fetch_url: "https://httpbin.org/response-headers?X-Probe-Marker=ok".into(),
            fetch_marker: ResponseMarker::default(),
            user_agent: concat!("proxy-scout/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ProberConfig {
    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> FetchResponse {
        FetchResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.into(),
        }
    }

    #[test]
    fn test_header_marker_checks_every_value() {
        let marker = ResponseMarker::HeaderContains {
            name: "Set-Cookie".into(),
            needle: "POESESSID".into(),
        };
        let resp = response(
            200,
            &[("set-cookie", "a=1"), ("set-cookie", "POESESSID=abc; Path=/")],
            "",
        );
        assert!(marker.matches(&resp));
        assert!(!marker.matches(&response(200, &[("set-cookie", "a=1")], "")));
    }

    #[test]
    fn test_status_alone_is_not_a_header_marker_match() {
        assert!(!ResponseMarker::default().matches(&response(200, &[], "ok")));
        assert!(ResponseMarker::SuccessStatus.matches(&response(204, &[], "")));
        assert!(!ResponseMarker::SuccessStatus.matches(&response(403, &[], "")));
    }

    #[test]
    fn test_body_marker() {
        let marker = ResponseMarker::BodyContains {
            needle: "welcome".into(),
        };
        assert!(marker.matches(&response(200, &[], "<h1>welcome</h1>")));
    }

    #[test]
    fn test_marker_deserializes_from_tagged_form() {
        let marker: ResponseMarker =
            serde_json::from_str(r#"{"kind":"header_contains","name":"X-A","needle":"b"}"#).unwrap();
        assert_eq!(
            marker,
            ResponseMarker::HeaderContains {
                name: "X-A".into(),
                needle: "b".into()
            }
        );
    }
}
