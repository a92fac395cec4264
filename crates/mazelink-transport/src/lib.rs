//! Transport abstraction layer for mazelink.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the client-facing network protocol, and the [`Frame`] type that carries
//! one discrete message (text or binary) across it.
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
pub use websocket::{WebSocketConnection, WebSocketIncoming, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Identifier for a connection, derived from the peer's remote address.
///
/// Unique while the connection is open. Once the peer disconnects the
/// operating system may hand the same address/port pair to a later
/// connection, so an id must never outlive the connection it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(SocketAddr);

impl ConnectionId {
    /// Creates a `ConnectionId` from a remote address.
    pub fn new(peer: SocketAddr) -> Self {
        Self(peer)
    }

    /// Returns the remote address this id was derived from.
    pub fn peer_addr(self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for ConnectionId {
    fn from(peer: SocketAddr) -> Self {
        Self::new(peer)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// One discrete message unit delivered over a persistent connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 text frame.
    Text(String),
    /// An opaque binary frame.
    Binary(Vec<u8>),
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// An accepted stream that has not finished its handshake yet.
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming stream.
    ///
    /// Returns as soon as the peer is accepted, before any protocol
    /// handshake, so one slow peer cannot hold up the accept loop.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// An accepted peer whose handshake is still pending.
pub trait Incoming: Send + 'static {
    /// The connection produced by a successful handshake.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// The remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Completes the handshake, giving up after `deadline`.
    async fn upgrade(self, deadline: Duration) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// Sending and receiving are independent: a task blocked in
/// [`recv`](Connection::recv) must not prevent another task from calling
/// [`send`](Connection::send) on the same connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, frame: Frame) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().expect("valid socket address")
    }

    #[test]
    fn test_connection_id_new_and_peer_addr() {
        let id = ConnectionId::new(addr("127.0.0.1:4242"));
        assert_eq!(id.peer_addr(), addr("127.0.0.1:4242"));
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::from(addr("10.0.0.7:50000"));
        assert_eq!(id.to_string(), "peer-10.0.0.7:50000");
    }

    #[test]
    fn test_connection_id_equality_follows_address() {
        let a = ConnectionId::new(addr("127.0.0.1:1"));
        let b = ConnectionId::new(addr("127.0.0.1:1"));
        let c = ConnectionId::new(addr("127.0.0.1:2"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(addr("127.0.0.1:1")), "alice");
        map.insert(ConnectionId::new(addr("127.0.0.1:2")), "bob");
        assert_eq!(map[&ConnectionId::new(addr("127.0.0.1:1"))], "alice");
    }

}
