//! Core protocol types: the commands a player can issue and the names
//! players go by.
//!
//! These types carry no formatting logic of their own. Turning them into
//! wire text (and back) is the job of the free functions in the codec
//! module, so the wire format can be tested independently of the variant
//! definitions.

use std::borrow::Borrow;
use std::fmt;

use crate::DecodeError;

// ---------------------------------------------------------------------------
// PlayerName
// ---------------------------------------------------------------------------

/// A player's display name.
///
/// A newtype over `String` that can only be built from text that survives
/// the authority protocol: non-empty, no `:` (the event separator) and no
/// whitespace (the authority keeps only the first word of each side).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerName(String);

impl PlayerName {
    /// Validates and wraps a display name.
    ///
    /// # Errors
    /// - [`DecodeError::EmptyName`] if `name` is empty
    /// - [`DecodeError::InvalidName`] if it contains `:` or whitespace
    pub fn new(name: impl Into<String>) -> Result<Self, DecodeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DecodeError::EmptyName);
        }
        if name.contains(|c: char| c == ':' || c.is_whitespace()) {
            return Err(DecodeError::InvalidName(name));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlayerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lets a `HashMap<PlayerName, _>` be queried with a plain `&str`.
impl Borrow<str> for PlayerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PlayerName {
    type Error = DecodeError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the four directions a player can move in the maze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in wire-token order.
    pub const ALL: [Direction; 4] =
        [Self::Up, Self::Down, Self::Left, Self::Right];
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A typed player command.
///
/// This is a closed set. Clients can only produce `Move` and `Rename`
/// directly (see [`decode_text`](crate::decode_text)); `Run` comes from
/// the audio classifier, and `Connect`/`Disconnect` are session events
/// the relay itself emits toward the authority.
///
/// Commands carry no connection identity: the relay supplies the player
/// name from the connection that produced the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A player joined the game under `name`.
    Connect(PlayerName),
    /// A player left the game.
    Disconnect(PlayerName),
    /// The connection wants to be known as a new name.
    Rename(PlayerName),
    /// Move one step in a direction.
    Move(Direction),
    /// The audio-triggered run command.
    Run,
}

impl Command {
    /// Returns `true` for the session events `Connect` and `Disconnect`.
    pub fn is_session_event(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Disconnect(_))
    }
}
