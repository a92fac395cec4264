//! The authority gateway: one event, one TCP round trip.

use std::future::Future;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::ForwardError;

/// Something that can deliver a serialized event to the game authority.
///
/// [`AuthorityGateway`] is the real implementation; the trait exists so
/// the [`ForwardQueue`](crate::ForwardQueue) can be driven by anything
/// with the same contract. Implementations must not retry internally;
/// retry policy belongs to the caller.
pub trait Authority: Send + Sync + 'static {
    /// Delivers one event. Each call is independent of every other call.
    fn forward(
        &self,
        event: &str,
    ) -> impl Future<Output = Result<(), ForwardError>> + Send;
}

/// Delivers events to the authority over plain TCP.
///
/// Every call opens a fresh connection, writes the UTF-8 bytes of the
/// event, shuts down the write half so the authority sees end-of-stream,
/// and drops the socket. The authority reads each connection to the end
/// and treats its contents as exactly one event, so connections are never
/// reused or batched.
#[derive(Debug, Clone)]
pub struct AuthorityGateway {
    addr: String,
    timeout: Duration,
}

impl AuthorityGateway {
    /// Creates a gateway for the authority at `addr` (`host:port`).
    ///
    /// `timeout` bounds the connect phase and, separately, the write
    /// phase of each call.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// The authority address this gateway connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream, ForwardError> {
        let connecting = TcpStream::connect(self.addr.as_str());
        match tokio::time::timeout(self.timeout, connecting).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                Err(ForwardError::ConnectionRefused {
                    addr: self.addr.clone(),
                })
            }
            Ok(Err(source)) => Err(ForwardError::Connect {
                addr: self.addr.clone(),
                source,
            }),
            Err(_) => Err(ForwardError::ConnectTimeout(self.timeout)),
        }
    }
}

impl Authority for AuthorityGateway {
    async fn forward(&self, event: &str) -> Result<(), ForwardError> {
        let mut stream = self.connect().await?;

        let writing = write_event(&mut stream, event.as_bytes());
        tokio::time::timeout(self.timeout, writing)
            .await
            .map_err(|_| ForwardError::WriteTimeout(self.timeout))??;

        tracing::trace!(addr = %self.addr, %event, "event delivered");
        Ok(())
    }
}

/// Writes the whole payload and half-closes the stream.
async fn write_event(
    stream: &mut TcpStream,
    bytes: &[u8],
) -> Result<(), ForwardError> {
    let expected = bytes.len();
    let mut written = 0;
    while written < expected {
        match stream.write(&bytes[written..]).await {
            Ok(0) => {
                return Err(ForwardError::PartialWrite { written, expected });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) if written > 0 => {
                return Err(ForwardError::PartialWrite { written, expected });
            }
            Err(e) => return Err(ForwardError::Io(e)),
        }
    }
    stream.shutdown().await.map_err(ForwardError::Io)
}
