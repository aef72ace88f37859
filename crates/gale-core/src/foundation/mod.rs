//! Foundation layer - Core data types.
//!
//! This module contains the values that flow through a dispatch:
//! - Headers and wire messages
//! - Requests, responses and the [`IntoResponse`] conversion
//! - The per-dispatch execution [`Context`]
//! - Deadline resolution

pub mod context;
pub mod deadline;
pub mod headers;
pub mod message;
pub mod request;
pub mod response;

pub use context::{Context, ScopeGuard};
pub use deadline::DEFAULT_TIMEOUT;
pub use headers::{DEADLINE_HEADER, ERROR_HEADER, Headers};
pub use message::Message;
pub use request::Request;
pub use response::{IntoResponse, Response};
