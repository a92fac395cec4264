//! Error types for the session layer.

use mazelink_protocol::PlayerName;
use mazelink_transport::ConnectionId;

/// Errors that can occur while binding connections to player identities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The name is already bound to another live connection.
    /// Display names are unique across connections; the first claim wins.
    #[error("player name {name} is already taken by {holder}")]
    NameTaken {
        name: PlayerName,
        holder: ConnectionId,
    },

    /// No identity is bound to the connection.
    #[error("no player bound to {0}")]
    NotFound(ConnectionId),

    /// The authority already assigned a different id to this identity.
    /// Authority ids never change once set.
    #[error("player {name} already has authority id {current}")]
    AuthorityIdAlreadySet { name: PlayerName, current: u64 },
}
