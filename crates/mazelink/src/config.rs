//! Relay configuration, loadable from TOML.
//!
//! ```toml
//! listen_addr = "0.0.0.0:3012"
//! authority_addr = "127.0.0.1:8080"
//! forward_timeout_ms = 2000
//! handshake_timeout_ms = 5000
//! queue_capacity = 256
//! ack_policy = "after-forward"
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//! ```
//!
//! Every field is optional; missing ones take their [`Default`] value.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use mazelink_authority::RetryPolicy;
use serde::Deserialize;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`RelayConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// When a client hears back about a command it sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AckPolicy {
    /// Acknowledge once the event is queued for the authority. The ack
    /// says "received", not "applied"; forward failures are only logged.
    #[default]
    Immediate,

    /// Acknowledge only after the authority accepted the event. Holds that
    /// connection's next frame until the forward finishes, and sends no
    /// ack at all when it fails.
    AfterForward,
}

impl FromStr for AckPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(Self::Immediate),
            "after-forward" => Ok(Self::AfterForward),
            other => Err(format!(
                "unknown ack policy {other:?} (expected \"immediate\" or \"after-forward\")"
            )),
        }
    }
}

/// Configuration for a relay instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the client-facing WebSocket listener binds to.
    pub listen_addr: String,

    /// Address of the game authority (`host:port`).
    pub authority_addr: String,

    /// Bound on each of the connect and write phases of one forward.
    pub forward_timeout_ms: u64,

    /// How long an accepted client may take to complete the WebSocket
    /// upgrade before it is dropped.
    pub handshake_timeout_ms: u64,

    /// Maximum number of events waiting for the authority.
    pub queue_capacity: usize,

    /// Retry behaviour for failed forwards.
    pub retry: RetryPolicy,

    /// When clients get their acknowledgment.
    pub ack_policy: AckPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3012".to_string(),
            authority_addr: "127.0.0.1:8080".to_string(),
            forward_timeout_ms: 2_000,
            handshake_timeout_ms: 5_000,
            queue_capacity: 256,
            retry: RetryPolicy::default(),
            ack_policy: AckPolicy::default(),
        }
    }
}

impl RelayConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// The per-phase forward timeout as a `Duration`.
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    /// The client handshake timeout as a `Duration`.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = RelayConfig::from_toml_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.forward_timeout(), Duration::from_secs(2));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_overrides_fields() {
        let config = RelayConfig::from_toml_str(
            r#"
            listen_addr = "0.0.0.0:9000"
            ack_policy = "after-forward"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.authority_addr, "127.0.0.1:8080");
        assert_eq!(config.ack_policy, AckPolicy::AfterForward);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 50);
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        let err = RelayConfig::from_toml_str("ack_policy = \"sometimes\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = RelayConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_ack_policy_from_str() {
        assert_eq!("immediate".parse(), Ok(AckPolicy::Immediate));
        assert_eq!("after-forward".parse(), Ok(AckPolicy::AfterForward));
        assert!("never".parse::<AckPolicy>().is_err());
    }
}
