//! # Gale Framework
//!
//! Ready-made middleware for building Gale services.
//!
//! This layer provides:
//! - Request tracing with latency and outcome ([`trace`])
//! - Panic recovery ([`recover`])
//! - Request id propagation ([`request_id`])
//! - Deadline enforcement ([`timeout`])
//! - Tower interop: any [`tower::Layer`] over [`HandlerService`] becomes a
//!   [`Middleware`](gale_core::Middleware) through [`layer`]
//!
//! None of this is required by the core; a server without middleware serves
//! requests just the same.
//!
//! ```rust,ignore
//! use gale_framework::{recover, request_id, trace};
//!
//! server.use_middleware([trace(), request_id(), recover()]);
//! ```

pub mod error;
pub mod middleware;
pub mod service;

pub use error::{DeadlineExceeded, HandlerPanicked};
pub use middleware::{REQUEST_ID_HEADER, RequestId, recover, request_id, timeout, trace};
pub use service::{HandlerService, layer};
