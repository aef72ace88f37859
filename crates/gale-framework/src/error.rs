//! Error types for the Gale framework.
//!
//! These travel back to callers inside error responses; their `Display` text
//! is what ends up in the error header.

use thiserror::Error;

/// Returned by [`timeout`](crate::middleware::timeout) when the call's
/// deadline passes before the handler finishes.
#[derive(Debug, Clone, Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// Returned by [`recover`](crate::middleware::recover) in place of a handler
/// that panicked.
#[derive(Debug, Clone, Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanicked(pub String);
