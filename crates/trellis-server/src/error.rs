//! Server error types.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur while serving an application.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// IO error on the listener.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
