//! Unified error type for the relay.

use mazelink_authority::ForwardError;
use mazelink_protocol::DecodeError;
use mazelink_session::SessionError;
use mazelink_transport::TransportError;

use crate::config::ConfigError;
use crate::registry::DeliveryError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
///
/// Inside a running relay almost none of these escape a connection: decode
/// and resolution failures are logged and dropped, delivery failures turn
/// into registry cleanup, and forward failures are logged by the forward
/// queue. What reaches the caller of [`RelayServer`](crate::RelayServer)
/// is startup trouble: a bad config or a listener that won't bind.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Client text that is not a command.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A session binding was refused.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The authority could not be reached.
    #[error(transparent)]
    Forward(#[from] ForwardError),

    /// A reply could not be delivered to a client.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
