//! Wire protocol for mazelink.
//!
//! This crate defines the two "languages" the relay speaks:
//!
//! - **Client text**: `up`, `down`, `left`, `right` and `nick:<name>`,
//!   decoded by [`decode_text`] into a typed [`Command`].
//! - **Authority events**: `"<name>:<token>"`, produced by
//!   [`encode_event`] and parsed by [`parse_event`].
//!
//! Binary client frames are audio for the classifier and are only wrapped
//! ([`decode_binary`]), never interpreted.
//!
//! The protocol layer holds no state. It doesn't know about connections
//! or sessions; it only converts between text and commands.
//!
//! ```text
//! Transport (frames) → Protocol (Command) → Session (player name)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{
    AudioFrame, EVENT_SEPARATOR, NICK_PREFIX, command_token, decode_binary,
    decode_text, direction_token, encode_event, parse_direction, parse_event,
};
pub use error::DecodeError;
pub use types::{Command, Direction, PlayerName};
