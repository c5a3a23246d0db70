//! # Error Types

use std::io;

use thiserror::Error;

/// Candidate-level probe failure. Sub-probe errors never surface here; they
/// are captured inside each [`crate::ProbeResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("probe cancelled")]
    Cancelled,

    /// Every protocol hit the shared deadline.
    #[error("probe deadline exceeded for all protocols")]
    DeadlineExceeded,

    /// A protocol task panicked.
    #[error("probe task failed: {0}")]
    Join(String),
}

/// Failure of a single network operation through a relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("http request failed: {0}")]
    Http(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("websocket handshake failed: {0}")]
    WebSocket(String),

    #[error("proxy tunnel failed: {0}")]
    Tunnel(String),

    #[error("socks handshake failed: {0}")]
    Socks(String),

    #[error("i/o error: {message}")]
    Io { kind: io::ErrorKind, message: String },

    /// Name resolution failed. `temporary` mirrors `EAI_AGAIN`.
    #[error("dns lookup failed: {message}")]
    Dns { temporary: bool, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Timeouts, connection resets/aborts, interrupted calls and temporary
    /// DNS failures are worth one more attempt; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout => true,
            TransportError::Dns { temporary, .. } => *temporary,
            TransportError::Io { kind, .. } => matches!(
                kind,
                io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

impl TransportError {
    /// Classify an I/O failure, reporting it as `message`.
    pub fn from_io(err: &io::Error, message: String) -> Self {
        if err.kind() == io::ErrorKind::TimedOut {
            return TransportError::Timeout;
        }
        if let Some(temporary) = dns_failure(&err.to_string()) {
            return TransportError::Dns { temporary, message };
        }
        TransportError::Io {
            kind: err.kind(),
            message,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        let message = err.to_string();
        TransportError::from_io(&err, message)
    }
}

/// Resolver errors reach us as uncategorized I/O errors, so only the
/// message tells them apart. Returns whether the failure is temporary.
fn dns_failure(message: &str) -> Option<bool> {
    let message = message.to_ascii_lowercase();
    let is_dns = message.contains("failed to lookup address")
        || message.contains("name resolution")
        || message.contains("dns error");
    is_dns.then(|| message.contains("temporary failure") || message.contains("try again"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::from(io::Error::from(io::ErrorKind::ConnectionReset)).is_transient());
        assert!(!TransportError::from(io::Error::from(io::ErrorKind::ConnectionRefused)).is_transient());
        assert!(!TransportError::Status(502).is_transient());
        assert!(!TransportError::WebSocket("bad upgrade".into()).is_transient());
    }

    #[test]
    fn test_dns_failures_classified() {
        let again = io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Temporary failure in name resolution",
        );
        let err = TransportError::from(again);
        assert!(matches!(err, TransportError::Dns { temporary: true, .. }));
        assert!(err.is_transient());

        let unknown = io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        );
        let err = TransportError::from(unknown);
        assert!(matches!(err, TransportError::Dns { temporary: false, .. }));
        assert!(!err.is_transient());

        let refused = TransportError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(refused, TransportError::Io { .. }));
    }
}
