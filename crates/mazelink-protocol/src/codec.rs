//! Text codec: client frames → [`Command`], and [`Command`] → authority
//! events.
//!
//! Two wire forms exist:
//!
//! ```text
//! client  → relay      up | down | left | right | nick:<name>
//! relay   → authority  <name>:<token>
//! ```
//!
//! where `<token>` is one of `up down left right run connect disconnect`.
//! The authority form doubles as the client-visible rename confirmation,
//! so [`encode_event`] is the single place that format is produced.

use crate::{Command, DecodeError, Direction, PlayerName};

/// Prefix of the client rename command.
pub const NICK_PREFIX: &str = "nick:";

/// Separator between the player name and the token in an authority event.
pub const EVENT_SEPARATOR: char = ':';

/// Returns the wire token for a direction.
pub fn direction_token(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Parses a direction token. Matching is exact and case-sensitive.
pub fn parse_direction(token: &str) -> Option<Direction> {
    match token {
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        "left" => Some(Direction::Left),
        "right" => Some(Direction::Right),
        _ => None,
    }
}

/// Returns the token a command is known by on the authority wire.
///
/// A `Rename` is announced to the authority as a `connect` under the new
/// name, so it shares that token.
pub fn command_token(command: &Command) -> &'static str {
    match command {
        Command::Connect(_) | Command::Rename(_) => "connect",
        Command::Disconnect(_) => "disconnect",
        Command::Move(direction) => direction_token(*direction),
        Command::Run => "run",
    }
}

/// Decodes one client text frame into a [`Command`].
///
/// # Errors
/// - [`DecodeError::Unrecognized`] for anything that is neither a direction
///   token nor `nick:`-prefixed
/// - [`DecodeError::EmptyName`] / [`DecodeError::InvalidName`] for a
///   `nick:` frame whose name cannot be carried to the authority
pub fn decode_text(raw: &str) -> Result<Command, DecodeError> {
    if let Some(direction) = parse_direction(raw) {
        return Ok(Command::Move(direction));
    }
    if let Some(name) = raw.strip_prefix(NICK_PREFIX) {
        return PlayerName::new(name).map(Command::Rename);
    }
    Err(DecodeError::Unrecognized(raw.to_owned()))
}

/// An opaque binary payload (audio samples) bound for the classifier.
///
/// The relay never looks inside; it only reports the length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    payload: Vec<u8>,
}

impl AudioFrame {
    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Borrows the raw payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the frame, returning the raw payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }
}

/// Wraps a binary frame for the classifier. Never fails.
pub fn decode_binary(bytes: Vec<u8>) -> AudioFrame {
    AudioFrame { payload: bytes }
}

/// Encodes the authority event `"<name>:<token>"` for a command issued by
/// (or on behalf of) `name`.
pub fn encode_event(name: &PlayerName, command: &Command) -> String {
    format!("{name}{EVENT_SEPARATOR}{}", command_token(command))
}

/// Parses an authority event back into the player name and command.
///
/// Follows the authority's own reading of the format: the text must split
/// into exactly two parts on `:`, and only the first whitespace-separated
/// word of each part counts (so a trailing newline from `echo` is fine).
/// `connect`/`disconnect` come back as `Connect`/`Disconnect` carrying the
/// name.
///
/// # Errors
/// [`DecodeError::MalformedEvent`] if the shape is wrong or the token is
/// unknown.
pub fn parse_event(raw: &str) -> Result<(PlayerName, Command), DecodeError> {
    let malformed = || DecodeError::MalformedEvent(raw.to_owned());

    let mut parts = raw.split(EVENT_SEPARATOR);
    let (Some(name_part), Some(token_part), None) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    let name = name_part
        .split_whitespace()
        .next()
        .ok_or_else(malformed)?;
    let token = token_part
        .split_whitespace()
        .next()
        .ok_or_else(malformed)?;
    let name = PlayerName::new(name).map_err(|_| malformed())?;

    let command = match token {
        "connect" => Command::Connect(name.clone()),
        "disconnect" => Command::Disconnect(name.clone()),
        "run" => Command::Run,
        other => Command::Move(parse_direction(other).ok_or_else(malformed)?),
    };
    Ok((name, command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PlayerName {
        PlayerName::new(s).unwrap()
    }

    #[test]
    fn test_direction_tokens_decode_to_moves() {
        for direction in Direction::ALL {
            let token = direction_token(direction);
            assert_eq!(decode_text(token), Ok(Command::Move(direction)));
        }
    }

    #[test]
    fn test_move_events_use_the_decode_token() {
        let bob = name("Bob");
        for direction in Direction::ALL {
            let token = direction_token(direction);
            let command = decode_text(token).unwrap();
            assert_eq!(encode_event(&bob, &command), format!("Bob:{token}"));
        }
    }

    #[test]
    fn test_nick_decodes_to_rename() {
        assert_eq!(
            decode_text("nick:Bob"),
            Ok(Command::Rename(name("Bob")))
        );
    }

    #[test]
    fn test_nick_with_bad_names() {
        assert_eq!(decode_text("nick:"), Err(DecodeError::EmptyName));
        assert_eq!(
            decode_text("nick:Bob Smith"),
            Err(DecodeError::InvalidName("Bob Smith".into()))
        );
        assert_eq!(
            decode_text("nick:a:b"),
            Err(DecodeError::InvalidName("a:b".into()))
        );
    }

    #[test]
    fn test_unrecognized_text_is_an_error_every_time() {
        for raw in ["", "UP", " up", "up ", "jump", "nick", "Nick:Bob", "run"] {
            let first = decode_text(raw);
            let second = decode_text(raw);
            assert_eq!(first, Err(DecodeError::Unrecognized(raw.to_owned())));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_session_and_audio_tokens() {
        let bob = name("Bob");
        assert_eq!(
            encode_event(&bob, &Command::Connect(bob.clone())),
            "Bob:connect"
        );
        assert_eq!(
            encode_event(&bob, &Command::Disconnect(bob.clone())),
            "Bob:disconnect"
        );
        assert_eq!(encode_event(&bob, &Command::Run), "Bob:run");
        assert_eq!(
            encode_event(&bob, &Command::Rename(bob.clone())),
            "Bob:connect"
        );
    }

    #[test]
    fn test_decode_binary_keeps_payload_opaque() {
        let frame = decode_binary(vec![0xff; 5000]);
        assert_eq!(frame.len(), 5000);
        assert!(!frame.is_empty());
        assert_eq!(frame.into_bytes(), vec![0xff; 5000]);
    }

    #[test]
    fn test_parse_event_accepts_echo_style_input() {
        assert_eq!(
            parse_event("okko:connect\n"),
            Ok((name("okko"), Command::Connect(name("okko"))))
        );
        assert_eq!(
            parse_event("okko:left"),
            Ok((name("okko"), Command::Move(Direction::Left)))
        );
        assert_eq!(parse_event("okko:run"), Ok((name("okko"), Command::Run)));
    }

    #[test]
    fn test_parse_event_rejects_malformed_input() {
        for raw in ["okko", "okko:", ":up", "a:b:up", "okko:fly", ""] {
            assert!(
                matches!(parse_event(raw), Err(DecodeError::MalformedEvent(_))),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_event_inverts_encode_event() {
        let alice = name("alice");
        let command = Command::Disconnect(alice.clone());
        let wire = encode_event(&alice, &command);
        assert_eq!(parse_event(&wire), Ok((alice, command)));
    }
}
