//! Error types for backend channel operations.

use thiserror::Error;

/// Errors from opening a backend channel.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Failed to spawn the relay subprocess.
    #[error("Failed to spawn relay process for port {port}: {source}")]
    SpawnFailed {
        /// The container port the relay was meant to reach.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The relay subprocess started without the expected stdio pipes.
    #[error("Relay process for port {port} did not expose stdio pipes")]
    MissingPipes {
        /// The container port the relay was meant to reach.
        port: u16,
    },

    /// The backend refused the channel.
    #[error("Backend refused channel to port {port}: {reason}")]
    Refused {
        /// The container port that was requested.
        port: u16,
        /// Why the backend said no.
        reason: String,
    },
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failed_display() {
        let err = BackendError::SpawnFailed {
            port: 8080,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("8080"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_missing_pipes_display() {
        let err = BackendError::MissingPipes { port: 3000 };
        assert!(err.to_string().contains("3000"));
    }
}
