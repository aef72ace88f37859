//! Integration layer - External system interfaces.
//!
//! This module contains the interfaces the core uses to talk to the outside
//! world: the publish-subscribe [`Transport`] and the [`Connector`] that
//! creates it.

pub mod transport;

pub use transport::{BoxedTransport, Connector, MessageHandler, Transport};
