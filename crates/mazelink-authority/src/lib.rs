//! Event forwarding from the relay to the downstream game authority.
//!
//! The authority speaks a deliberately tiny protocol: connect, write one
//! `"<name>:<token>"` event, close. This crate provides:
//!
//! - [`AuthorityGateway`]: performs exactly that round trip, once per
//!   call, behind the [`Authority`] trait.
//! - [`ForwardQueue`]: a bounded queue drained by its own task, so
//!   client-facing code enqueues and moves on instead of waiting on the
//!   authority's socket.
//! - [`RetryPolicy`]: bounded exponential backoff applied by the queue
//!   to connect-phase failures.

mod error;
mod gateway;
mod queue;
mod retry;

pub use error::ForwardError;
pub use gateway::{Authority, AuthorityGateway};
pub use queue::{Completion, ForwardQueue};
pub use retry::RetryPolicy;
