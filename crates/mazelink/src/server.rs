//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties together all the
//! layers: transport → protocol → session → authority, with the
//! connection registry delivering replies.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mazelink_authority::{AuthorityGateway, ForwardQueue};
use mazelink_protocol::{Command, PlayerName, encode_event};
use mazelink_session::{SessionDirectory, SessionError};
use mazelink_transport::{ConnectionId, Transport, WebSocketTransport};
use tokio::sync::mpsc;

use crate::classifier::{Classifier, LoggingClassifier, Recognition, RecognitionSink};
use crate::config::{AckPolicy, RelayConfig};
use crate::handler::{handle_connection, pump_recognitions};
use crate::registry::{ConnectionRegistry, PresenceHooks};
use crate::RelayError;

/// Locks a mutex, recovering the data if a previous holder panicked. Every
/// critical section here leaves the guarded structure consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Registry hooks that keep the session directory and the authority in
/// step with connection lifetimes.
pub(crate) struct SessionHooks {
    sessions: Arc<Mutex<SessionDirectory>>,
    forwarder: ForwardQueue,
}

impl SessionHooks {
    /// Unbinds `conn` and tells the authority its player left. Returns the
    /// name it held.
    fn release(&self, conn: ConnectionId) -> Option<PlayerName> {
        let name = lock(&self.sessions).unregister_by_connection(conn)?;
        let event = encode_event(&name, &Command::Disconnect(name.clone()));
        // Runs inside the registry lock, so it cannot wait for capacity.
        if let Err(e) = self.forwarder.try_submit(event) {
            tracing::warn!(%conn, %name, error = %e, "could not queue disconnect");
        }
        Some(name)
    }
}

impl PresenceHooks for SessionHooks {
    fn on_joined(&self, conn: ConnectionId) -> Option<String> {
        Some(format!("{} joined", conn.peer_addr()))
    }

    fn on_left(&self, conn: ConnectionId) -> Option<String> {
        Some(match self.release(conn) {
            Some(name) => format!("{name} left"),
            None => format!("{} left", conn.peer_addr()),
        })
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The two
/// mutexes are never held across an `.await`; when both are needed the
/// registry is locked first (its hooks lock the directory).
pub(crate) struct ServerState<C: Classifier> {
    sessions: Arc<Mutex<SessionDirectory>>,
    registry: Mutex<ConnectionRegistry<SessionHooks>>,
    pub(crate) forwarder: ForwardQueue,
    pub(crate) classifier: C,
    pub(crate) recognitions: RecognitionSink,
    pub(crate) ack_policy: AckPolicy,
}

impl<C: Classifier> ServerState<C> {
    pub(crate) fn new(
        forwarder: ForwardQueue,
        classifier: C,
        recognitions: RecognitionSink,
        ack_policy: AckPolicy,
    ) -> Self {
        let sessions = Arc::new(Mutex::new(SessionDirectory::new()));
        let presence = SessionHooks {
            sessions: Arc::clone(&sessions),
            forwarder: forwarder.clone(),
        };
        Self {
            sessions,
            registry: Mutex::new(ConnectionRegistry::new(presence)),
            forwarder,
            classifier,
            recognitions,
            ack_policy,
        }
    }

    pub(crate) fn sessions(&self) -> MutexGuard<'_, SessionDirectory> {
        lock(&self.sessions)
    }

    pub(crate) fn registry(
        &self,
    ) -> MutexGuard<'_, ConnectionRegistry<SessionHooks>> {
        lock(&self.registry)
    }

    /// Binds `name` to `conn`, but only while `conn` is still registered.
    ///
    /// The registry lock is held across the check and the directory
    /// update, so a connection that closes concurrently is either bound
    /// before its cleanup runs or refused here. A closed connection never
    /// gains a binding.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if `conn` is no longer registered
    /// - [`SessionError::NameTaken`] if another connection holds `name`
    pub(crate) fn bind(
        &self,
        conn: ConnectionId,
        name: PlayerName,
    ) -> Result<Option<PlayerName>, SessionError> {
        let registry = self.registry();
        if !registry.contains(conn) {
            return Err(SessionError::NotFound(conn));
        }
        let bound = self.sessions().register(conn, name);
        drop(registry);
        bound
    }

    /// Tears down everything the relay knows about `conn`. The registry
    /// hooks unbind its player and announce the departure.
    ///
    /// Idempotent. A connection that a failed delivery already removed
    /// was cleaned up then, and [`bind`](Self::bind) refuses it since.
    pub(crate) fn close(&self, conn: ConnectionId) {
        if !self.registry().remove(conn) {
            tracing::debug!(%conn, "connection already removed");
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use mazelink::prelude::*;
///
/// # async fn start() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .listen("0.0.0.0:3012")
///     .authority("127.0.0.1:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder<C: Classifier = LoggingClassifier> {
    config: RelayConfig,
    classifier: C,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
            classifier: LoggingClassifier,
        }
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Classifier> RelayServerBuilder<C> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address the client listener binds to.
    pub fn listen(mut self, addr: &str) -> Self {
        self.config.listen_addr = addr.to_string();
        self
    }

    /// Sets the authority address.
    pub fn authority(mut self, addr: &str) -> Self {
        self.config.authority_addr = addr.to_string();
        self
    }

    /// Sets when clients are acknowledged.
    pub fn ack_policy(mut self, policy: AckPolicy) -> Self {
        self.config.ack_policy = policy;
        self
    }

    /// Uses a custom audio classifier.
    pub fn classifier<D: Classifier>(self, classifier: D) -> RelayServerBuilder<D> {
        RelayServerBuilder {
            config: self.config,
            classifier,
        }
    }

    /// Binds the listener and starts the forward worker.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<RelayServer<C>, RelayError> {
        let transport = WebSocketTransport::bind(&self.config.listen_addr).await?;

        let gateway = AuthorityGateway::new(
            self.config.authority_addr.clone(),
            self.config.forward_timeout(),
        );
        let forwarder = ForwardQueue::spawn(
            gateway,
            self.config.retry.clone(),
            self.config.queue_capacity,
        );
        let (sink, recognitions) = RecognitionSink::channel();

        tracing::info!(
            authority = %self.config.authority_addr,
            ack_policy = ?self.config.ack_policy,
            "relay configured"
        );

        let state = Arc::new(ServerState::new(
            forwarder,
            self.classifier,
            sink,
            self.config.ack_policy,
        ));

        Ok(RelayServer {
            transport,
            handshake_timeout: self.config.handshake_timeout(),
            state,
            recognitions,
        })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound relay, ready to accept clients.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<C: Classifier = LoggingClassifier> {
    transport: WebSocketTransport,
    handshake_timeout: Duration,
    state: Arc<ServerState<C>>,
    recognitions: mpsc::UnboundedReceiver<Recognition>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Classifier> RelayServer<C> {
    /// Returns the local address the client listener is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, RelayError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop.
    ///
    /// Spawns one handler task per accepted peer and one task that
    /// dispatches classifier recognitions. The WebSocket handshake runs
    /// in the peer's own task, so a peer that stalls mid-upgrade only
    /// delays itself. A failure on one connection never stops the loop.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        let Self {
            mut transport,
            handshake_timeout,
            state,
            recognitions,
        } = self;

        tokio::spawn(pump_recognitions(Arc::clone(&state), recognitions));
        tracing::info!(addr = ?transport.local_addr().ok(), "relay running");

        loop {
            match transport.accept().await {
                Ok(incoming) => {
                    tokio::spawn(handle_connection(
                        incoming,
                        handshake_timeout,
                        Arc::clone(&state),
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
