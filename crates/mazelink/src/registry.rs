//! The set of live client connections, and delivery to them.
//!
//! The registry never touches a socket. Each connection is represented by
//! the sending half of an unbounded channel whose receiver is drained by
//! that connection's writer task. A closed channel means the writer is
//! gone, which is how a dead peer shows up here.

use std::collections::HashMap;

use mazelink_transport::{ConnectionId, Frame};
use tokio::sync::mpsc;

/// Outbound handle for one connection.
pub type ConnectionHandle = mpsc::UnboundedSender<Frame>;

/// Errors from a unicast delivery. Neither is fatal; both mean the
/// recipient is no longer reachable.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The connection is not registered (it already left).
    #[error("connection {0} not found")]
    NotFound(ConnectionId),

    /// The connection was registered but its writer is gone. It has been
    /// removed from the registry.
    #[error("connection {0} is gone")]
    Gone(ConnectionId),
}

/// Callbacks fired as connections join and leave.
///
/// Each returns an optional announcement that the registry broadcasts to
/// every connection still registered. Hooks run with the registry borrowed,
/// so they must not call back into it.
pub trait PresenceHooks: Send + 'static {
    /// A connection was added.
    fn on_joined(&self, conn: ConnectionId) -> Option<String>;

    /// A connection was removed, explicitly or because a delivery to it
    /// failed.
    fn on_left(&self, conn: ConnectionId) -> Option<String>;
}

/// No announcements.
impl PresenceHooks for () {
    fn on_joined(&self, _conn: ConnectionId) -> Option<String> {
        None
    }

    fn on_left(&self, _conn: ConnectionId) -> Option<String> {
        None
    }
}

/// Owns the live connections and delivers text to them.
pub struct ConnectionRegistry<H: PresenceHooks> {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    hooks: H,
}

impl<H: PresenceHooks> ConnectionRegistry<H> {
    /// Creates an empty registry.
    pub fn new(hooks: H) -> Self {
        Self {
            connections: HashMap::new(),
            hooks,
        }
    }

    /// Registers a newly opened connection and announces it.
    pub fn add(&mut self, conn: ConnectionId, handle: ConnectionHandle) {
        if self.connections.insert(conn, handle).is_some() {
            // Address reuse before the previous holder was cleaned up.
            tracing::warn!(%conn, "replaced a stale connection handle");
        }
        tracing::info!(%conn, connections = self.connections.len(), "connection added");

        if let Some(announcement) = self.hooks.on_joined(conn) {
            self.broadcast(&announcement);
        }
    }

    /// Deregisters a connection and announces its departure.
    ///
    /// Idempotent: returns `false`, without firing the hook, if the
    /// connection was not registered.
    pub fn remove(&mut self, conn: ConnectionId) -> bool {
        if self.connections.remove(&conn).is_none() {
            return false;
        }
        tracing::info!(%conn, connections = self.connections.len(), "connection removed");
        self.announce_departure(conn);
        true
    }

    /// Delivers `message` to every registered connection.
    ///
    /// Best effort: a recipient whose writer is gone is removed (firing
    /// its departure hook) and the rest still receive the message.
    /// Returns the number of connections the message was handed to.
    pub fn broadcast(&mut self, message: &str) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (conn, handle) in &self.connections {
            if handle.send(Frame::Text(message.to_owned())).is_ok() {
                delivered += 1;
            } else {
                dead.push(*conn);
            }
        }

        for conn in dead {
            if self.connections.remove(&conn).is_some() {
                tracing::debug!(%conn, "dropped dead connection during broadcast");
                self.announce_departure(conn);
            }
        }

        tracing::trace!(delivered, text = message, "broadcast");
        delivered
    }

    /// Delivers `message` to one connection.
    ///
    /// # Errors
    /// - [`DeliveryError::NotFound`] if `conn` is not registered
    /// - [`DeliveryError::Gone`] if its writer is gone; `conn` is removed
    pub fn unicast(
        &mut self,
        conn: ConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let handle = self
            .connections
            .get(&conn)
            .ok_or(DeliveryError::NotFound(conn))?;

        if handle.send(Frame::Text(message.to_owned())).is_err() {
            self.remove(conn);
            return Err(DeliveryError::Gone(conn));
        }
        Ok(())
    }

    /// Returns `true` if `conn` is registered.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.connections.contains_key(&conn)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn announce_departure(&mut self, conn: ConnectionId) {
        if let Some(announcement) = self.hooks.on_left(conn) {
            self.broadcast(&announcement);
        }
    }
}
