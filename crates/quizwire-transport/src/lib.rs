//! Transport abstraction layer for Quizwire.
//!
//! Provides the [`Transport`] and [`Connection`] traits that hide the
//! network protocol from the session core. Connections carry opaque byte
//! frames; turning them into events is the protocol crate's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use quizwire_protocol::ConnectionId;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique connection id (`conn-1`, `conn-2`, ...).
pub fn next_connection_id() -> ConnectionId {
    let n = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    ConnectionId::new(format!("conn-{n}"))
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A single client connection.
///
/// `send` and `recv` may run concurrently from different tasks: a
/// connection handler reads client frames while room events are pushed
/// out.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> &ConnectionId;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
