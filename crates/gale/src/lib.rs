//! # Gale
//!
//! Request/response RPC over publish-subscribe messaging.
//!
//! ## Overview
//!
//! Gale lets a process register named handlers, one per subject, wrap them
//! in a middleware chain and serve them over a message broker. Every server
//! instance sharing a name joins the same queue group, so calls to a subject
//! are load-balanced across instances.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌────────────┐     ┌─────────┐
//! │ Transport │────▶│ Dispatcher │────▶│ Middleware │────▶│ Handler │
//! │ (broker)  │◀────│  (1 reply) │◀────│   chain    │◀────│         │
//! └───────────┘     └────────────┘     └────────────┘     └─────────┘
//! ```
//!
//! - **Server**: Connects, subscribes, runs until shut down
//! - **Dispatcher**: Resolves the deadline, calls the handler, sends exactly one reply
//! - **Middleware**: Handler decorators composed once at startup
//! - **Handlers**: Plain async functions `(Context, Request) -> impl IntoResponse`
//!
//! Handler errors travel back to the caller in the `Gale-Error` response
//! header; callers may pin a deadline with the `Gale-Deadline` header.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gale::prelude::*;
//!
//! async fn echo(_ctx: Context, req: Request) -> Response {
//!     Response::from_bytes(req.payload().clone())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = MemoryBroker::new();
//!     let mut server = Server::builder(ServerConfig::new("echo"))
//!         .connect(&broker)
//!         .await?;
//!     server.handle("echo", echo);
//!     server.use_middleware([trace(), recover()]);
//!
//!     server.run_until_ctrl_c().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `memory`: In-process broker transport (default)
//! - `toml-config`: TOML configuration files (default)
//! - `json-log`: JSON log output

pub use gale_core as core;
pub use gale_framework as framework;
pub use gale_runtime as runtime;
pub use gale_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use gale::prelude::*;
/// ```
pub mod prelude {
    // Server - main entry point
    pub use gale_runtime::config::{GaleConfig, ServerConfig, load_config};
    pub use gale_runtime::{Server, ServerState, logging};

    // Handlers and their inputs/outputs
    pub use gale_core::{
        Context, DEADLINE_HEADER, ERROR_HEADER, Headers, IntoResponse, Message, Request, Response,
    };

    // Middleware
    pub use gale_core::{Middleware, Next};
    pub use gale_framework::{layer, recover, request_id, timeout, trace};

    // Transports
    pub use gale_core::{Connector, Transport, TransportError};
    #[cfg(feature = "memory")]
    pub use gale_transport::MemoryBroker;
}
