//! Error types for authority forwarding.

use std::time::Duration;

/// Errors that can occur while delivering an event to the authority.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Nothing is listening at the authority address.
    #[error("authority at {addr} refused the connection")]
    ConnectionRefused { addr: String },

    /// Connecting failed for a reason other than refusal.
    #[error("could not connect to authority at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection was not established within the timeout.
    #[error("connecting to the authority timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The event was not fully written within the timeout.
    #[error("writing to the authority timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The authority stopped accepting bytes before the event was complete.
    #[error("partial write to authority: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    /// Any other I/O failure after the connection was established.
    #[error("authority I/O failed: {0}")]
    Io(#[source] std::io::Error),

    /// The forward queue is at capacity.
    #[error("forward queue is full")]
    QueueFull,

    /// The forward queue's worker has stopped.
    #[error("forward queue is closed")]
    QueueClosed,
}

impl ForwardError {
    /// Returns `true` for failures where the authority cannot have seen
    /// any part of the event, so sending it again cannot duplicate it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused { .. }
                | Self::Connect { .. }
                | Self::ConnectTimeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connect_phase_failures_are_retryable() {
        assert!(
            ForwardError::ConnectionRefused {
                addr: "127.0.0.1:8080".into()
            }
            .is_retryable()
        );
        assert!(ForwardError::ConnectTimeout(Duration::from_secs(1)).is_retryable());
        assert!(!ForwardError::WriteTimeout(Duration::from_secs(1)).is_retryable());
        assert!(
            !ForwardError::PartialWrite {
                written: 2,
                expected: 6
            }
            .is_retryable()
        );
        assert!(!ForwardError::QueueFull.is_retryable());
    }
}
