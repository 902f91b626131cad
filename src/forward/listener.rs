//! Per-port TCP listener and accept loop.
//!
//! Each listener owns one bound socket. The accept loop itself blocks on
//! slot acquisition while the pool is saturated: new connections are left
//! in the OS listen queue, which is the whole backpressure mechanism; there
//! is no user-space queue in front of the sessions.
//!
//! A bind failure or a hard accept error is fatal for the port and
//! escalates to the process-wide shutdown signal: if one configured port
//! cannot forward, the whole process comes down rather than limping along
//! partially bound. The shutdown signal is observed cooperatively between
//! accepts; it stops the loop but does not interrupt sessions already
//! running.

use std::io;
use std::sync::Arc;

use socket2::SockRef;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use super::admission::SlotPool;
use super::error::{ForwardError, ForwardResult};
use super::session::ForwardSession;
use super::IO_BUFFER_SIZE;
use crate::backend::{BackendOpener, RelayProber};
use crate::shutdown::ShutdownSignal;

/// Listener for one configured host port.
pub struct PortListener {
    port: u16,
    target: Arc<str>,
    slots: SlotPool,
    prober: Arc<dyn RelayProber>,
    opener: Arc<dyn BackendOpener>,
    shutdown: ShutdownSignal,
}

impl PortListener {
    /// Create a listener for `port`, forwarding into `target`.
    pub fn new(
        port: u16,
        target: Arc<str>,
        slots: SlotPool,
        prober: Arc<dyn RelayProber>,
        opener: Arc<dyn BackendOpener>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            port,
            target,
            slots,
            prober,
            opener,
            shutdown,
        }
    }

    /// The port this listener is configured for.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the listener until shutdown or a fatal error.
    ///
    /// A fatal error is logged and fires the process-wide shutdown signal
    /// before returning; a shutdown observed from elsewhere just stops the
    /// accept loop.
    pub async fn run(self) {
        if let Err(e) = self.serve().await {
            error!("Failed to listen on port {}: {}", self.port, e);
            self.shutdown.fire();
        }
    }

    /// Bind and accept until shutdown or a fatal error.
    async fn serve(&self) -> ForwardResult<()> {
        info!("Starting listener on port {}", self.port);

        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(|e| ForwardError::ListenFailed {
                port: self.port,
                source: e,
            })?;

        if let Err(e) = tune_listener(&listener) {
            warn!(
                "Failed to set socket options on listener for port {}: {}",
                self.port, e
            );
        }

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown_rx.wait_for(|fired| *fired) => {
                    info!("Listener on port {} shutting down", self.port);
                    return Ok(());
                }
            };

            let (stream, peer_addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) if is_transient_accept_error(&e) => {
                    debug!("Transient accept error on port {}: {}", self.port, e);
                    continue;
                }
                Err(e) => {
                    return Err(ForwardError::AcceptFailed {
                        port: self.port,
                        source: e,
                    });
                }
            };

            debug!("Accepted {} on port {}", peer_addr, self.port);

            if let Err(e) = tune_peer(&stream) {
                warn!("Failed to set socket options for {}: {}", peer_addr, e);
            }

            // Blocks this accept loop while the pool is saturated; further
            // connections wait in the OS listen queue until a slot frees.
            let slot = self.slots.acquire().await;

            let session = ForwardSession::new(Arc::clone(&self.target), self.port);
            let prober = Arc::clone(&self.prober);
            let opener = Arc::clone(&self.opener);
            tokio::spawn(async move {
                session.run(stream, prober, opener, slot).await;
            });
        }
    }
}

/// Socket options for the listening socket: no Nagle coalescing, 16 KiB
/// send/receive buffers, keepalive.
fn tune_listener(listener: &TcpListener) -> io::Result<()> {
    let sock = SockRef::from(listener);
    sock.set_nodelay(true)?;
    sock.set_send_buffer_size(IO_BUFFER_SIZE)?;
    sock.set_recv_buffer_size(IO_BUFFER_SIZE)?;
    sock.set_keepalive(true)?;
    Ok(())
}

/// Socket options for an accepted peer: no Nagle coalescing, 16 KiB
/// send/receive buffers.
fn tune_peer(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let sock = SockRef::from(stream);
    sock.set_send_buffer_size(IO_BUFFER_SIZE)?;
    sock.set_recv_buffer_size(IO_BUFFER_SIZE)?;
    Ok(())
}

/// Accept errors that affect only the connection being accepted, not the
/// listening socket itself.
fn is_transient_accept_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}
