//! Error types for the forwarding engine.

use thiserror::Error;

/// Errors from listener setup and the accept loop.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Failed to bind the listening socket.
    #[error("Failed to listen on port {port}: {source}")]
    ListenFailed {
        /// The port we tried to listen on.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop hit a hard, non-transient error.
    #[error("Failed to accept on port {port}: {source}")]
    AcceptFailed {
        /// The port the listener was accepting on.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for forwarding operations.
pub type ForwardResult<T> = Result<T, ForwardError>;
