//! # Adapters Layer
//!
//! - `observer.rs` - structured-log observer (always available)
//! - `http_transport.rs` - reqwest transport (feature `network`)
//! - `websocket.rs` - tunnelled WebSocket dialer (feature `network`)

pub mod observer;

#[cfg(feature = "network")]
pub mod http_transport;

#[cfg(feature = "network")]
pub mod websocket;
