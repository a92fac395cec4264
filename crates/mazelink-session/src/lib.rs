//! Player session directory for mazelink.
//!
//! Tracks which live connection speaks for which player:
//!
//! 1. **Identity**: a player's display name plus the id the authority
//!    may assign ([`PlayerIdentity`])
//! 2. **Binding**: the two-way connection ↔ name mapping
//!    ([`SessionDirectory`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay (above)  ← resolves the sender of every command through here
//!     ↕
//! Session Layer (this crate)  ← connection ↔ player identity
//!     ↕
//! Protocol + Transport (below)  ← PlayerName, ConnectionId
//! ```

mod directory;
mod error;
mod identity;

pub use directory::SessionDirectory;
pub use error::SessionError;
pub use identity::PlayerIdentity;
