//! # Gale Transport
//!
//! Transport implementations for the Gale RPC framework.
//!
//! This crate provides concrete implementations of the [`Transport`] and
//! [`Connector`] traits defined in `gale-core`. Transport types are selected
//! through feature flags.
//!
//! ## Features
//!
//! - `memory` (default): in-process broker, for tests, demos and embedding
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  gale-runtime       │  (Server lifecycle)
//! ├─────────────────────┤
//! │  gale-core          │  (Transport / Connector traits)
//! ├─────────────────────┤
//! │  gale-transport     │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Broker             │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gale_transport::MemoryBroker;
//! use gale_core::Connector;
//!
//! let broker = MemoryBroker::new();
//! let transport = broker.connect("memory://local").await?;
//!
//! // Call a subject served by some connection
//! let reply = broker
//!     .request("add", Headers::new(), r#"{"a":1,"b":2}"#, Duration::from_secs(1))
//!     .await?;
//! ```
//!
//! [`Transport`]: gale_core::Transport
//! [`Connector`]: gale_core::Connector

// Transport implementations (feature-gated)
#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{MEMORY_SCHEME, MemoryBroker, MemoryConnection};
