/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade handshake failed for an accepted stream.
    #[error("handshake with {peer} failed: {source}")]
    HandshakeFailed {
        peer: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The peer did not finish the WebSocket upgrade in time.
    #[error("handshake with {peer} timed out after {after:?}")]
    HandshakeTimeout {
        peer: std::net::SocketAddr,
        after: std::time::Duration,
    },
}
