//! # Mazelink
//!
//! WebSocket command relay between maze players and a game authority.
//!
//! Players connect over WebSocket, pick a name with `nick:<name>` and then
//! send direction tokens (`up`, `down`, `left`, `right`). The relay
//! resolves each command to the sender's player name and forwards it to
//! the authority as a `"<name>:<token>"` event over a short-lived TCP
//! connection. Binary frames are audio and go to a pluggable
//! [`Classifier`], whose recognitions are relayed like typed commands.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mazelink::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .listen("0.0.0.0:3012")
//!     .authority("127.0.0.1:8080")
//!     .ack_policy(AckPolicy::Immediate)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod classifier;
mod config;
mod error;
mod handler;
mod registry;
mod server;

pub use classifier::{Classifier, LoggingClassifier, Recognition, RecognitionSink};
pub use config::{AckPolicy, ConfigError, RelayConfig};
pub use error::RelayError;
pub use registry::{ConnectionHandle, ConnectionRegistry, DeliveryError, PresenceHooks};
pub use server::{RelayServer, RelayServerBuilder};

pub use mazelink_authority::{Authority, AuthorityGateway, ForwardError, ForwardQueue, RetryPolicy};
pub use mazelink_protocol::{AudioFrame, Command, DecodeError, Direction, PlayerName};
pub use mazelink_session::{SessionDirectory, SessionError};
pub use mazelink_transport::{ConnectionId, TransportError};

/// Everything needed to run a relay or plug in a classifier.
pub mod prelude {
    pub use crate::{
        AckPolicy, AudioFrame, Classifier, Command, ConnectionId, Direction,
        LoggingClassifier, PlayerName, Recognition, RecognitionSink, RelayConfig,
        RelayError, RelayServer, RelayServerBuilder, RetryPolicy,
    };
}
