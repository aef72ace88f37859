//! Unified error types for the Gale core.
//!
//! Handler-level failures are plain [`BoxError`]s carried inside a
//! [`Response`](crate::Response); they never surface here. This module holds
//! the errors of the transport seam.

use std::time::Duration;

use thiserror::Error;

/// A boxed, thread-safe error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The connection has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The transport rejected a subscription.
    #[error("failed to subscribe to '{subject}': {reason}")]
    SubscribeFailed {
        /// The subject that could not be subscribed.
        subject: String,
        /// Reason for failure.
        reason: String,
    },

    /// A response was requested for a message that has no reply address.
    #[error("message on '{subject}' has no reply subject")]
    NoReplySubject {
        /// Subject of the original message.
        subject: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Flushing outbound traffic failed.
    #[error("flush failed: {0}")]
    FlushFailed(String),

    /// Flushing did not finish within the allotted time.
    #[error("flush timed out after {0:?}")]
    FlushTimeout(Duration),

    /// Nobody is subscribed to the subject of a request.
    #[error("no responders for subject '{subject}'")]
    NoResponders {
        /// The subject that had no subscribers.
        subject: String,
    },

    /// A request did not receive a reply in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
