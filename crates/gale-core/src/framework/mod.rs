//! Framework layer - Handler composition and dispatch.
//!
//! This module contains the request processing pipeline:
//! - Handler trait and type erasure into [`HandlerFunc`]
//! - Middleware composition
//! - The two-phase subject registry
//! - The per-message [`Dispatcher`]

pub mod dispatcher;
pub mod handler;
pub mod middleware;
pub mod registry;

pub use dispatcher::{Dispatcher, ErrorHandler, NoHandler, noop_error_handler};
pub use handler::{BoxFuture, Handler, HandlerFunc, handler_fn};
pub use middleware::{Middleware, Next, compose};
pub use registry::{HandlerTable, Registry};
