//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::server::ServerState;
use gale_core::TransportError;

/// Errors that can occur during server construction and lifecycle operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The server configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport could not be reached.
    #[error("Failed to connect: {0}")]
    Connect(#[source] TransportError),

    /// A subject could not be subscribed; the server did not start.
    #[error("Failed to subscribe '{subject}': {source}")]
    Subscribe {
        subject: String,
        #[source]
        source: TransportError,
    },

    /// Flushing or closing the transport failed; the server is still running.
    #[error("Shutdown failed: {0}")]
    Shutdown(#[source] TransportError),

    /// A lifecycle operation was called in the wrong state.
    #[error("Invalid server state: expected {expected}, found {actual}")]
    InvalidState {
        expected: ServerState,
        actual: ServerState,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
