//! # Integration Fixtures
//!
//! Scripted collaborators shared by the flow tests. Relays are always
//! scripted through `ps_03_proxy_prober::testing`; only feeds touch a socket.

pub mod bulk;
pub mod flows;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ps_01_candidate_sources::{CandidateProvider, PageEmitter, SourceError};
use ps_03_proxy_prober::testing::{ProtocolScript, ScriptedTransport};
use ps_03_proxy_prober::{ProberConfig, Prober, ProxyProber};
use shared_types::{Candidate, Protocol};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Feed that yields a fixed list on every poll.
pub struct StaticFeed {
    pub name: String,
    pub candidates: Vec<Candidate>,
}

impl StaticFeed {
    pub fn new(name: &str, candidates: Vec<Candidate>) -> Self {
        Self {
            name: name.to_string(),
            candidates,
        }
    }
}

#[async_trait]
impl CandidateProvider for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(
        &self,
        emitter: &mut PageEmitter<'_>,
        _cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        for candidate in &self.candidates {
            emitter.push(candidate.clone()).await?;
        }
        Ok(())
    }
}

/// Prober whose relays answer plain HTTP only, anonymously.
pub fn http_only_prober() -> (Arc<ScriptedTransport>, Arc<dyn Prober>) {
    let transport =
        Arc::new(ScriptedTransport::new().script(Protocol::Http, ProtocolScript::working()));
    let prober = Arc::new(ProxyProber::new(
        transport.clone(),
        ProberConfig::for_testing(),
    ));
    (transport, prober)
}

/// Serve `body` as a `text/plain` 200 to the first connection, then stop.
pub async fn serve_feed_once(body: &str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 4096];
        let mut seen = Vec::new();
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    });

    addr
}
