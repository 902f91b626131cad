//! Backend channel abstraction: the seam between the forwarding engine and
//! whatever mechanism reaches into the container.
//!
//! The engine only needs two capabilities:
//!
//! - [`RelayProber`]: is the relay mechanism currently usable against the
//!   target? `false` means fail closed: no backend is opened.
//! - [`BackendOpener`]: open a duplex byte channel to a port inside the
//!   target.
//!
//! The reference implementation is [`DockerRelay`], which bridges through a
//! per-connection `socat` subprocess. Tests substitute in-process backends.

pub mod docker;
mod error;

pub use docker::DockerRelay;
pub use error::{BackendError, BackendResult};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Reader half of a backend channel.
pub type BackendReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writer half of a backend channel.
pub type BackendWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A duplex byte channel into the target's port namespace.
///
/// The two halves are kept separate so that each copy direction of a session
/// can own its half exclusively and shut it down independently (half-close).
pub struct BackendChannel {
    reader: BackendReader,
    writer: BackendWriter,
}

impl BackendChannel {
    /// Build a channel from a reader and writer half.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Split the channel into its reader and writer halves.
    pub fn into_split(self) -> (BackendReader, BackendWriter) {
        (self.reader, self.writer)
    }
}

/// Checks whether the relay mechanism is usable against a target.
#[async_trait]
pub trait RelayProber: Send + Sync {
    /// Probe the target. `false` means the relay cannot be used right now.
    async fn probe(&self, target: &str) -> bool;
}

/// Opens duplex byte channels into a target.
#[async_trait]
pub trait BackendOpener: Send + Sync {
    /// Open a channel to `port` inside `target`.
    async fn open(&self, target: &str, port: u16) -> BackendResult<BackendChannel>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_channel_split_halves_are_connected() {
        let (near, mut far) = tokio::io::duplex(64);
        let (read_half, write_half) = tokio::io::split(near);
        let channel = BackendChannel::new(read_half, write_half);

        let (mut reader, mut writer) = channel.into_split();

        writer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        far.write_all(b"pong").await.unwrap();
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }
}
