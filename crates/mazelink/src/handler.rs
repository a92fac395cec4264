//! Per-connection handler: the relay's state machine.
//!
//! Each accepted peer gets its own Tokio task running this handler, plus
//! a writer task that drains the connection's outbound channel. The flow
//! is:
//!   1. Connecting → Open: WebSocket upgrade (bounded by the handshake
//!      timeout), then register with the registry (joined broadcast)
//!   2. Open → Open: read frames one at a time and dispatch them
//!   3. Open → Closed: deregister (session cleanup + departure broadcast)
//!
//! Frames from one connection are handled strictly in arrival order
//! because the read loop doesn't take the next frame until the current
//! one is dispatched.

use std::sync::Arc;
use std::time::Duration;

use mazelink_protocol::{
    Command, PlayerName, command_token, decode_binary, decode_text, encode_event,
};
use mazelink_transport::{
    Connection, ConnectionId, Frame, Incoming, WebSocketConnection, WebSocketIncoming,
};
use tokio::sync::mpsc;

use crate::classifier::{Classifier, Recognition};
use crate::config::AckPolicy;
use crate::server::ServerState;

/// Drop guard that closes the connection's relay state when the handler
/// exits, even if it panics.
struct CloseGuard<C: Classifier> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Classifier> Drop for CloseGuard<C> {
    fn drop(&mut self) {
        self.state.close(self.conn_id);
    }
}

/// Handles a single peer from accept to close.
pub(crate) async fn handle_connection<C: Classifier>(
    incoming: WebSocketIncoming,
    handshake_timeout: Duration,
    state: Arc<ServerState<C>>,
) {
    // --- Connecting → Open ---
    let peer = incoming.peer_addr();
    let conn = match incoming.upgrade(handshake_timeout).await {
        Ok(conn) => Arc::new(conn),
        Err(e) => {
            tracing::debug!(%peer, error = %e, "rejected client");
            return;
        }
    };
    let conn_id = conn.id();

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx));
    state.registry().add(conn_id, tx);
    let guard = CloseGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // --- Open: read loop ---
    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        match frame {
            Frame::Text(text) => match decode_text(&text) {
                Ok(command) => dispatch(&state, conn_id, command).await,
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                }
            },
            Frame::Binary(data) => {
                let audio = decode_binary(data);
                tracing::trace!(%conn_id, bytes = audio.len(), "audio frame");
                state.classifier.submit(conn_id, audio, &state.recognitions);
            }
        }
    }

    // --- Closed ---
    // Deregistering drops the registry's sender, so the writer flushes
    // what is queued and then closes the socket.
    drop(guard);
    let _ = writer.await;
}

/// Drains a connection's outbound channel onto the socket.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
) {
    let conn_id = conn.id();
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = conn.send(frame).await {
            // Dropping the receiver marks the connection dead for the
            // registry.
            tracing::debug!(%conn_id, error = %e, "send failed");
            return;
        }
    }
    let _ = conn.close().await;
}

/// Dispatches classifier recognitions for as long as the relay runs.
pub(crate) async fn pump_recognitions<C: Classifier>(
    state: Arc<ServerState<C>>,
    mut recognitions: mpsc::UnboundedReceiver<Recognition>,
) {
    while let Some(Recognition { source, command }) = recognitions.recv().await {
        // Joins and leaves follow the connection's lifetime, never audio.
        if command.is_session_event() {
            tracing::debug!(%source, ?command, "ignoring session event from classifier");
            continue;
        }
        tracing::debug!(%source, ?command, "classifier recognized command");
        dispatch(&state, source, command).await;
    }
}

/// Applies one decoded command from `conn_id`.
pub(crate) async fn dispatch<C: Classifier>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    command: Command,
) {
    let command = match command {
        Command::Rename(name) => return rename(state, conn_id, name).await,
        other => other,
    };

    let name = state.sessions().find_name_by_connection(conn_id).cloned();
    let Some(name) = name else {
        tracing::debug!(%conn_id, ?command, "dropping command from unnamed connection");
        return;
    };

    let event = encode_event(&name, &command);
    tracing::debug!(%conn_id, %event, "relaying command");
    if forward(state, event).await {
        reply(state, conn_id, command_token(&command));
    }
}

/// Binds `name` to the connection and announces it to the authority.
async fn rename<C: Classifier>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    name: PlayerName,
) {
    let registered = state.bind(conn_id, name.clone());
    let previous = match registered {
        Ok(previous) => previous,
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "rename rejected");
            return;
        }
    };

    let confirmation = encode_event(&name, &Command::Connect(name.clone()));

    match previous {
        // Already known by this name: the authority has nothing to learn.
        Some(old) if old == name => {
            reply(state, conn_id, &confirmation);
            return;
        }
        Some(old) => {
            let farewell = encode_event(&old, &Command::Disconnect(old.clone()));
            if let Err(e) = state.forwarder.submit(farewell).await {
                tracing::warn!(%conn_id, %old, error = %e, "could not queue disconnect");
            }
        }
        None => {}
    }

    if forward(state, confirmation.clone()).await {
        reply(state, conn_id, &confirmation);
    }
}

/// Queues an event for the authority. Returns whether the client should
/// be acknowledged, per the ack policy.
async fn forward<C: Classifier>(state: &ServerState<C>, event: String) -> bool {
    let completion = match state.forwarder.submit(event).await {
        Ok(completion) => completion,
        Err(e) => {
            tracing::warn!(error = %e, "could not queue event for authority");
            return state.ack_policy == AckPolicy::Immediate;
        }
    };

    match state.ack_policy {
        AckPolicy::Immediate => true,
        // The forward worker has already logged any failure.
        AckPolicy::AfterForward => completion.wait().await.is_ok(),
    }
}

/// Sends a text reply to one connection. The client may already be gone;
/// that is expected and not an error.
fn reply<C: Classifier>(state: &ServerState<C>, conn_id: ConnectionId, message: &str) {
    let delivered = state.registry().unicast(conn_id, message);
    if let Err(e) = delivered {
        tracing::debug!(error = %e, "reply not delivered");
    }
}
