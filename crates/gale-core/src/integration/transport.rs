//! The transport seam.
//!
//! Gale does not speak any wire protocol itself. A [`Transport`] provides the
//! four primitives the core consumes: queue-group subscriptions, replies,
//! flushing and closing. A [`Connector`] establishes transports so that
//! servers can validate reachability when they are constructed.
//!
//! Implementations live in `gale-transport`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::TransportResult;
use crate::foundation::Message;

// =============================================================================
// Message Handler
// =============================================================================

/// Callback invoked by a transport for every delivered message.
///
/// Transports may call it concurrently; each call handles one message.
pub type MessageHandler = Arc<dyn Fn(Message) -> BoxFuture<'static, ()> + Send + Sync>;

// =============================================================================
// Transport
// =============================================================================

/// A connected publish-subscribe transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribes `handler` to `subject` as a member of `group`.
    ///
    /// Among all subscribers sharing a group, each message is delivered to
    /// exactly one.
    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
        handler: MessageHandler,
    ) -> TransportResult<()>;

    /// Sends `response` back to the sender of `original`.
    async fn respond(&self, original: &Message, response: Message) -> TransportResult<()>;

    /// Waits until all buffered outbound traffic has been handed off.
    ///
    /// Callers bound the wait by dropping the future.
    async fn flush(&self) -> TransportResult<()>;

    /// Closes the connection and drops its subscriptions.
    async fn close(&self);
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

// =============================================================================
// Connector
// =============================================================================

/// Establishes transport connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `url`, failing fast when it is unreachable.
    async fn connect(&self, url: &str) -> TransportResult<BoxedTransport>;
}
