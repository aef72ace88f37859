//! Gale Runtime - Server lifecycle for the Gale RPC framework.
//!
//! This crate provides:
//! - The [`Server`]: registration, startup and graceful shutdown
//! - Layered configuration loading (`gale.toml`, `GALE_*` environment)
//! - Logging configuration
//!
//! ```ignore
//! use gale_runtime::{Server, config::load_config, logging};
//! use gale_transport::MemoryBroker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let broker = MemoryBroker::new();
//!     let mut server = Server::builder(config.server).connect(&broker).await?;
//!     server.handle("echo", echo);
//!
//!     // Run until Ctrl+C
//!     server.run_until_ctrl_c().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod server;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, GaleConfig, LoggingConfig, ServerConfig, SpanEvents,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use server::{Server, ServerBuilder, ServerState};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
