//! Hook for the external audio classifier.
//!
//! Binary frames carry audio samples. The relay doesn't interpret them; it
//! hands each one to a [`Classifier`], which may at some later point report
//! a recognized [`Command`] for the connection the audio came from. Those
//! reports flow through a [`RecognitionSink`] and are dispatched exactly
//! like a command the client typed.

use mazelink_protocol::{AudioFrame, Command};
use mazelink_transport::ConnectionId;
use tokio::sync::mpsc;

/// A command the classifier recognized in a connection's audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    /// The connection whose audio produced the command.
    pub source: ConnectionId,
    /// The recognized command.
    pub command: Command,
}

/// Where a classifier reports recognitions. Cheap to clone and safe to
/// move into whatever task does the classification.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    sender: mpsc::UnboundedSender<Recognition>,
}

impl RecognitionSink {
    /// Creates a sink and the receiver the relay drains it with.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Recognition>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Reports a recognized command. Returns `false` if the relay has shut
    /// down and nobody will act on it.
    pub fn recognized(&self, source: ConnectionId, command: Command) -> bool {
        self.sender.send(Recognition { source, command }).is_ok()
    }
}

/// Consumes audio frames and reports recognized commands.
///
/// `submit` is called on the connection's read path, so it must return
/// promptly; real classification belongs on another task or thread. At
/// most one command should be reported per buffer window.
pub trait Classifier: Send + Sync + 'static {
    /// Accepts one audio frame from `source`.
    fn submit(&self, source: ConnectionId, frame: AudioFrame, sink: &RecognitionSink);
}

/// Default classifier: logs the payload size and recognizes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingClassifier;

impl Classifier for LoggingClassifier {
    fn submit(&self, source: ConnectionId, frame: AudioFrame, _sink: &RecognitionSink) {
        tracing::debug!(%source, bytes = frame.len(), "audio frame received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_delivers_recognitions_in_order() {
        let (sink, mut rx) = RecognitionSink::channel();
        let source = ConnectionId::new(std::net::SocketAddr::from(([127, 0, 0, 1], 5)));

        assert!(sink.recognized(source, Command::Run));
        assert!(sink.clone().recognized(source, Command::Run));

        assert_eq!(rx.try_recv().unwrap().command, Command::Run);
        assert_eq!(rx.try_recv().unwrap().source, source);
    }

    #[test]
    fn test_sink_reports_closed_relay() {
        let (sink, rx) = RecognitionSink::channel();
        drop(rx);
        let source = ConnectionId::new(std::net::SocketAddr::from(([127, 0, 0, 1], 5)));
        assert!(!sink.recognized(source, Command::Run));
    }
}
