//! # Tunnelled WebSocket Dialer
//!
//! Opens a TCP stream to the endpoint through the relay, then runs the
//! WebSocket handshake (with TLS for `wss://`) over it:
//!
//! - HTTP/HTTPS: `CONNECT host:port` on the relay
//! - SOCKS5 and SOCKS4a: the relay resolves the host
//! - SOCKS4: resolved locally to an IPv4 address first

use std::net::SocketAddr;

use reqwest::Url;
use shared_types::Protocol;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use tokio_tungstenite::tungstenite;
use tracing::trace;

use crate::domain::errors::TransportError;
use crate::ports::outbound::ProxyTarget;

/// Upper bound on a CONNECT response header block.
const MAX_CONNECT_RESPONSE: usize = 8 * 1024;

/// Handshake with `url` through `target`, then close normally.
///
/// Success is decided by the handshake alone; a failed close is only traced.
pub async fn dial(target: ProxyTarget, url: &str) -> Result<(), TransportError> {
    let parsed = Url::parse(url).map_err(|e| TransportError::WebSocket(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| TransportError::WebSocket(format!("no host in {url}")))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| TransportError::WebSocket(format!("no port in {url}")))?;

    let stream = tunnel(target, &host, port).await?;
    let (mut ws, _response) = tokio_tungstenite::client_async_tls(url, stream)
        .await
        .map_err(map_ws)?;
    if let Err(err) = ws.close(None).await {
        trace!(error = %err, "websocket close failed");
    }
    Ok(())
}

async fn tunnel(target: ProxyTarget, host: &str, port: u16) -> Result<TcpStream, TransportError> {
    match target.protocol {
        Protocol::Http | Protocol::Https => http_connect(target.addr, host, port).await,
        Protocol::Socks5 => Socks5Stream::connect(target.addr, (host, port))
            .await
            .map(Socks5Stream::into_inner)
            .map_err(map_socks),
        Protocol::Socks4a => Socks4Stream::connect(target.addr, (host, port))
            .await
            .map(Socks4Stream::into_inner)
            .map_err(map_socks),
        Protocol::Socks4 => {
            let resolved = lookup_host((host, port))
                .await?
                .find(SocketAddr::is_ipv4)
                .ok_or_else(|| TransportError::Socks(format!("no IPv4 address for {host}")))?;
            Socks4Stream::connect(target.addr, resolved)
                .await
                .map(Socks4Stream::into_inner)
                .map_err(map_socks)
        }
    }
}

async fn http_connect(relay: SocketAddr, host: &str, port: u16) -> Result<TcpStream, TransportError> {
    let mut stream = TcpStream::connect(relay).await?;
    let request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut head = Vec::with_capacity(256);
    let mut chunk = [0u8; 512];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        if head.len() > MAX_CONNECT_RESPONSE {
            return Err(TransportError::Tunnel("oversized CONNECT response".into()));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(TransportError::Tunnel("relay closed during CONNECT".into()));
        }
        head.extend_from_slice(&chunk[..n]);
    }

    let status_line = head
        .split(|b| *b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .unwrap_or_default();
    if connect_accepted(&status_line) {
        Ok(stream)
    } else {
        Err(TransportError::Tunnel(status_line))
    }
}

fn connect_accepted(status_line: &str) -> bool {
    let mut parts = status_line.split_whitespace();
    matches!(
        (parts.next(), parts.next()),
        (Some(version), Some(code)) if version.starts_with("HTTP/1.") && code.starts_with('2')
    )
}

fn map_socks(err: tokio_socks::Error) -> TransportError {
    match err {
        tokio_socks::Error::Io(io_err) => io_err.into(),
        other => TransportError::Socks(other.to_string()),
    }
}

fn map_ws(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::Io(io_err) => io_err.into(),
        other => TransportError::WebSocket(other.to_string()),
    }
}
