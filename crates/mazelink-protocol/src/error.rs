//! Error types for the protocol layer.
//!
//! Decoding is total: every input either yields a `Command` or one of
//! these errors, and the same input always yields the same result.

/// Errors produced while decoding client text or authority events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The text is not a recognized command token.
    #[error("unrecognized command: {0:?}")]
    Unrecognized(String),

    /// A `nick:` command with nothing after the prefix.
    #[error("player name is empty")]
    EmptyName,

    /// A player name the authority protocol cannot carry.
    #[error("invalid player name: {0:?}")]
    InvalidName(String),

    /// An authority event that is not of the form `<name>:<token>`.
    #[error("malformed authority event: {0:?}")]
    MalformedEvent(String),
}
