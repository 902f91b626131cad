//! Per-connection forwarding session.
//!
//! A session exclusively owns one accepted client connection and, once
//! established, one backend channel. Two copy tasks relay bytes, one per
//! direction, until each hits end-of-stream or an error. A direction that
//! finishes half-closes the write side of the *other* endpoint so the remote
//! observes EOF promptly, while data still in flight the opposite way keeps
//! moving. The session's admission slot is released when the session ends,
//! on every path.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::admission::Slot;
use super::IO_BUFFER_SIZE;
use crate::backend::{BackendOpener, RelayProber};

/// Lifecycle of a forwarding session.
///
/// States advance strictly forward; a failure before the backend is
/// established jumps straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted and admitted, backend not yet opened.
    Created,
    /// Backend channel is open.
    BackendEstablished,
    /// Both copy directions are running.
    Forwarding,
    /// Copy directions finished, channels closing.
    Closing,
    /// Both channels closed, slot released.
    Closed,
}

/// One forwarding session: client connection in, backend channel out.
pub struct ForwardSession {
    target: Arc<str>,
    port: u16,
    state: SessionState,
}

impl ForwardSession {
    /// Create a session for a connection accepted on `port`.
    pub fn new(target: Arc<str>, port: u16) -> Self {
        Self {
            target,
            port,
            state: SessionState::Created,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            "Session on port {}: {:?} -> {:?}",
            self.port, self.state, next
        );
        self.state = next;
    }

    /// Run the session to completion and return the final state (always
    /// `Closed`).
    ///
    /// The client connection is closed on every exit path. `slot` is held
    /// for the whole session and released exactly once when this returns.
    pub async fn run(
        mut self,
        client: TcpStream,
        prober: Arc<dyn RelayProber>,
        opener: Arc<dyn BackendOpener>,
        slot: Slot,
    ) -> SessionState {
        info!(
            "New connection received, forwarding to container {} port {}",
            self.target, self.port
        );

        if !prober.probe(&self.target).await {
            warn!(
                "Relay is not usable in container {}, closing client connection",
                self.target
            );
            self.transition(SessionState::Closed);
            drop(client);
            drop(slot);
            info!("Connection closed");
            return self.state;
        }

        let channel = match opener.open(&self.target, self.port).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(
                    "Failed to open backend channel to {} port {}: {}",
                    self.target, self.port, e
                );
                self.transition(SessionState::Closed);
                drop(client);
                drop(slot);
                info!("Connection closed");
                return self.state;
            }
        };
        self.transition(SessionState::BackendEstablished);

        let (mut client_read, client_write) = client.into_split();
        let (mut backend_read, backend_write) = channel.into_split();

        self.transition(SessionState::Forwarding);

        let inbound = tokio::spawn(async move {
            let mut backend_write = backend_write;
            let copied =
                copy_until_eof(&mut client_read, &mut backend_write, "client->container").await;
            // Half-close: the backend must see end-of-stream once the client
            // is done sending. Shutdown flushes, the drop closes the half.
            if let Err(e) = backend_write.shutdown().await {
                debug!("client->container shutdown: {}", e);
            }
            copied
        });

        let outbound = tokio::spawn(async move {
            let mut client_write = client_write;
            let copied =
                copy_until_eof(&mut backend_read, &mut client_write, "container->client").await;
            if let Err(e) = client_write.shutdown().await {
                debug!("container->client shutdown: {}", e);
            }
            copied
        });

        let bytes_in = inbound.await.unwrap_or(0);
        let bytes_out = outbound.await.unwrap_or(0);

        self.transition(SessionState::Closing);
        debug!(
            "Session on port {} relayed {} bytes in, {} bytes out",
            self.port, bytes_in, bytes_out
        );

        // Both halves of both channels were dropped by the copy tasks.
        self.transition(SessionState::Closed);
        drop(slot);
        info!("Connection closed");
        self.state
    }
}

/// Copy from `reader` to `writer` in 16 KiB chunks until EOF or error.
///
/// Returns the number of bytes copied. A transport error is logged and
/// treated as end-of-stream for this direction only; the caller's other
/// direction keeps running.
async fn copy_until_eof<R, W>(reader: &mut R, writer: &mut W, direction: &str) -> u64
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; IO_BUFFER_SIZE];
    let mut copied: u64 = 0;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log_direction_end(direction, "read", &e);
                break;
            }
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            log_direction_end(direction, "write", &e);
            break;
        }
        copied += n as u64;
    }

    copied
}

fn log_direction_end(direction: &str, op: &str, error: &io::Error) {
    if is_disconnect(error) {
        debug!("{} {} ended: {}", direction, op, error);
    } else {
        warn!("Error in {} {}: {}", direction, op, error);
    }
}

/// Error kinds that are normal connection teardown, not faults.
fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}
