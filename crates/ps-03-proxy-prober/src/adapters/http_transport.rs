//! # HTTP Probe Transport
//!
//! Production [`ProbeTransport`] built on reqwest. A fresh client is built
//! per request so no connection is ever reused across relays or protocols.
//!
//! HTTP and HTTPS both route through the relay as an HTTP proxy; HTTPS
//! targets are reached with a CONNECT tunnel. SOCKS variants use reqwest's
//! SOCKS connector. Relay certificates are not verified.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy, Response};
use serde_json::Value;
use shared_types::Protocol;

use crate::adapters::websocket;
use crate::domain::config::{FetchResponse, ProberConfig};
use crate::domain::errors::TransportError;
use crate::ports::outbound::{ConnectivityReport, ProbeTransport, ProxyTarget};

/// reqwest + tokio-tungstenite transport.
#[derive(Debug, Clone)]
pub struct HttpProbeTransport {
    request_timeout: Duration,
    user_agent: String,
}

impl HttpProbeTransport {
    pub fn new(request_timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            request_timeout,
            user_agent: user_agent.into(),
        }
    }

    /// Per-request timeout equal to the candidate deadline.
    pub fn from_config(config: &ProberConfig) -> Self {
        Self::new(config.timeout, config.user_agent.clone())
    }

    fn client(&self, target: ProxyTarget) -> Result<Client, TransportError> {
        let proxy = Proxy::all(proxy_url(target)).map_err(map_reqwest)?;
        Client::builder()
            .proxy(proxy)
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.as_str())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(map_reqwest)
    }

    async fn get(&self, target: ProxyTarget, url: &str) -> Result<Response, TransportError> {
        self.client(target)?
            .get(url)
            .send()
            .await
            .map_err(map_reqwest)
    }
}

#[async_trait]
impl ProbeTransport for HttpProbeTransport {
    async fn connectivity(
        &self,
        target: ProxyTarget,
        url: &str,
    ) -> Result<ConnectivityReport, TransportError> {
        let response = self.get(target, url).await?;
        let status = response.status().as_u16();
        let response_headers = collect_headers(&response);
        let bytes = response.bytes().await.map_err(map_reqwest)?;
        Ok(ConnectivityReport {
            status,
            response_headers,
            body: serde_json::from_slice(&bytes).ok(),
        })
    }

    async fn websocket(&self, target: ProxyTarget, url: &str) -> Result<(), TransportError> {
        tokio::time::timeout(self.request_timeout, websocket::dial(target, url))
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    async fn get_json(&self, target: ProxyTarget, url: &str) -> Result<Value, TransportError> {
        let response = self.get(target, url).await?;
        let bytes = response.bytes().await.map_err(map_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn fetch(&self, target: ProxyTarget, url: &str) -> Result<FetchResponse, TransportError> {
        let response = self.get(target, url).await?;
        let status = response.status().as_u16();
        let headers = collect_headers(&response);
        let body = response.text().await.map_err(map_reqwest)?;
        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

/// Proxy URL reqwest understands for `target`.
fn proxy_url(target: ProxyTarget) -> String {
    let scheme = match target.protocol {
        Protocol::Http | Protocol::Https => "http",
        Protocol::Socks4 => "socks4",
        Protocol::Socks4a => "socks4a",
        Protocol::Socks5 => "socks5",
    };
    format!("{scheme}://{}", target.addr)
}

fn collect_headers(response: &Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Timeouts first, then the first I/O error in the chain, else the message.
fn map_reqwest(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return TransportError::from_io(io_err, err.to_string());
        }
        source = cause.source();
    }
    TransportError::Http(err.to_string())
}
