//! # Gale Core
//!
//! The core engine of the Gale RPC framework.
//!
//! Gale serves request/response RPC on top of a publish-subscribe transport.
//! This crate provides the building blocks: wire messages, the per-call
//! context, handlers and middleware, and the dispatcher that ties them to a
//! transport.
//!
//! ## Architecture Layers
//!
//! Gale Core is organized into three architectural layers:
//!
//! ### Foundation Layer
//!
//! Core data types:
//! - **Messages**: Wire messages and their headers ([`Message`], [`Headers`])
//! - **Requests and Responses**: [`Request`], [`Response`], [`IntoResponse`]
//! - **Context**: Deadline, cancellation and state per call ([`Context`])
//!
//! ### Framework Layer
//!
//! Request processing:
//! - **Handler System**: Type-erased handlers ([`Handler`], [`HandlerFunc`])
//! - **Middleware**: Handler decorators ([`Middleware`])
//! - **Registry**: Subject to handler mapping ([`Registry`], [`HandlerTable`])
//! - **Dispatcher**: One inbound message, one response ([`Dispatcher`])
//!
//! ### Integration Layer
//!
//! External system interfaces:
//! - **Transport**: The publish-subscribe seam ([`Transport`], [`Connector`])
//!
//! ## Message Flow
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌────────────┐     ┌─────────┐
//! │ Transport │────▶│ Dispatcher │────▶│ Middleware │────▶│ Handler │
//! │           │◀────│            │◀────│   chain    │◀────│         │
//! └───────────┘     └────────────┘     └────────────┘     └─────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use gale_core::{Context, Request, Response, Registry, handler_fn};
//!
//! async fn echo(_ctx: Context, req: Request) -> Response {
//!     Response::from_bytes(req.payload().clone())
//! }
//!
//! let mut registry = Registry::new();
//! registry.insert("echo", handler_fn(echo));
//! let table = registry.compile(&[]);
//! ```

// Architectural layers
pub mod error;
pub mod foundation;
pub mod framework;
pub mod integration;

// Re-export error types
pub use error::{BoxError, TransportError, TransportResult};

// Re-export foundation types
pub use foundation::{
    Context, DEADLINE_HEADER, DEFAULT_TIMEOUT, ERROR_HEADER, Headers, IntoResponse, Message,
    Request, Response, ScopeGuard, deadline,
};

// Re-export framework types
pub use framework::{
    BoxFuture, Dispatcher, ErrorHandler, Handler, HandlerFunc, HandlerTable, Middleware, Next,
    NoHandler, Registry, compose, handler_fn, noop_error_handler,
};

// Re-export integration types
pub use integration::{BoxedTransport, Connector, MessageHandler, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{BoxError, TransportError, TransportResult};
    pub use super::foundation::{
        Context, DEADLINE_HEADER, ERROR_HEADER, Headers, IntoResponse, Message, Request, Response,
    };
    pub use super::framework::{Handler, HandlerFunc, Middleware, Next, handler_fn};
    pub use super::integration::{BoxedTransport, Connector, Transport};
}
