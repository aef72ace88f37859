//! Server lifecycle.
//!
//! A [`Server`] owns a transport connection, a handler registry and a
//! middleware chain. Its lifecycle is a one-way state machine:
//!
//! ```text
//! Configured ──run()──▶ Starting ──subscribed──▶ Running ──shutdown()──▶ Stopped
//!                           │                                               ▲
//!                           └──────────── subscription fails ───────────────┘
//! ```
//!
//! `shutdown` is only accepted once every subject is subscribed. Use
//! [`Server::ready`] to wait for that point from another task.
//!
//! Registration takes `&mut self`, so it can only happen while the server is
//! exclusively owned. `run` and `shutdown` take `&self`; share the server
//! through an `Arc` to call them from different tasks.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gale_runtime::{Server, config::ServerConfig};
//! use gale_transport::MemoryBroker;
//!
//! let broker = MemoryBroker::new();
//! let mut server = Server::builder(ServerConfig::new("calculator"))
//!     .connect(&broker)
//!     .await?;
//! server.handle("add", add);
//!
//! let server = Arc::new(server);
//! let running = tokio::spawn({
//!     let server = Arc::clone(&server);
//!     async move { server.run().await }
//! });
//!
//! server.ready().await;
//! // ...
//! server.shutdown(Duration::from_secs(1)).await?;
//! running.await??;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::config::validation::validate_server_config;
use crate::error::{RuntimeError, RuntimeResult};
use gale_core::{
    BoxedTransport, Connector, Context, Dispatcher, ErrorHandler, Handler, Middleware, Registry,
    TransportError, noop_error_handler,
};

// =============================================================================
// Server State
// =============================================================================

/// Lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Constructed and accepting registrations.
    Configured = 0,
    /// `run` is subscribing; shutdown is not accepted yet.
    Starting = 1,
    /// Subscribed and serving requests.
    Running = 2,
    /// Shut down, terminal.
    Stopped = 3,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Configured,
            1 => Self::Starting,
            2 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configured => "configured",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Server Builder
// =============================================================================

/// Builder for [`Server`], created by [`Server::builder`].
pub struct ServerBuilder {
    config: ServerConfig,
    error_handler: ErrorHandler,
}

impl ServerBuilder {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            error_handler: noop_error_handler(),
        }
    }

    /// Sets the callback for transport failures during dispatch.
    ///
    /// Handler errors never reach it; they are returned to the caller.
    pub fn error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, &TransportError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(f);
        self
    }

    /// Validates the configuration and connects through `connector`.
    ///
    /// Fails immediately if the configured URL is unreachable.
    pub async fn connect<C>(self, connector: &C) -> RuntimeResult<Server>
    where
        C: Connector + ?Sized,
    {
        validate_server_config(&self.config)?;
        let transport = connector
            .connect(&self.config.url)
            .await
            .map_err(RuntimeError::Connect)?;
        info!(server = %self.config.name, url = %self.config.url, "Connected");
        Ok(self.assemble(transport))
    }

    /// Validates the configuration and uses an already connected transport.
    pub fn with_transport(self, transport: BoxedTransport) -> RuntimeResult<Server> {
        validate_server_config(&self.config)?;
        Ok(self.assemble(transport))
    }

    fn assemble(self, transport: BoxedTransport) -> Server {
        let (tx, rx) = oneshot::channel();
        Server {
            timeout: self.config.timeout(),
            name: self.config.name,
            transport,
            registry: Registry::new(),
            middleware: Vec::new(),
            error_handler: self.error_handler,
            state: AtomicU8::new(ServerState::Configured as u8),
            state_changed: Notify::new(),
            shutdown_tx: Mutex::new(Some(tx)),
            shutdown_rx: Mutex::new(Some(rx)),
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// An RPC server bound to one transport connection.
pub struct Server {
    name: String,
    timeout: Duration,
    transport: BoxedTransport,
    registry: Registry,
    middleware: Vec<Middleware>,
    error_handler: ErrorHandler,
    state: AtomicU8,
    state_changed: Notify,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    shutdown_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Server {
    /// Starts building a server from `config`.
    pub fn builder(config: ServerConfig) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    /// Registers `handler` for `subject`, replacing any previous handler.
    pub fn handle<H: Handler>(&mut self, subject: impl Into<String>, handler: H) -> &mut Self {
        let subject = subject.into();
        self.warn_if_started("handle");
        if self
            .registry
            .insert(subject.clone(), handler.into_handler_func())
        {
            debug!(subject = %subject, "Replaced handler");
        }
        self
    }

    /// Replaces the middleware chain.
    ///
    /// The first element is the outermost wrapper.
    pub fn use_middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Middleware>,
    {
        self.warn_if_started("use_middleware");
        self.middleware = middleware.into_iter().collect();
        self
    }

    fn warn_if_started(&self, op: &str) {
        let state = self.state();
        if state != ServerState::Configured {
            warn!(op, %state, "Registration after start has no effect");
        }
    }

    /// Registered subjects, in unspecified order.
    pub fn subjects(&self) -> Vec<String> {
        self.registry.subjects()
    }

    /// The service name, also used as the queue group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timeout applied to calls without a deadline header.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, from: ServerState, to: ServerState) -> RuntimeResult<()> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|actual| RuntimeError::InvalidState {
                expected: from,
                actual: ServerState::from_u8(actual),
            })?;
        self.state_changed.notify_waiters();
        Ok(())
    }

    /// Waits until the server is past startup and returns the state reached.
    ///
    /// Resolves with [`ServerState::Running`] once every subject is
    /// subscribed, or [`ServerState::Stopped`] if startup failed.
    pub async fn ready(&self) -> ServerState {
        loop {
            let changed = self.state_changed.notified();
            let state = self.state();
            if matches!(state, ServerState::Running | ServerState::Stopped) {
                return state;
            }
            changed.await;
        }
    }

    /// Subscribes every registered subject and serves until [`shutdown`]
    /// succeeds.
    ///
    /// Returns early with an error if any subscription fails; the transport
    /// is closed and the server is stopped in that case.
    ///
    /// [`shutdown`]: Server::shutdown
    pub async fn run(&self) -> RuntimeResult<()> {
        let stopped = self.start().await?;
        if let Some(stopped) = stopped {
            // The sender lives in `self`, so an error means it was consumed
            // by a completed shutdown.
            let _ = stopped.await;
        }

        info!(server = %self.name, "Server stopped");
        Ok(())
    }

    /// Moves through `Starting` to `Running`, returning the shutdown receiver.
    async fn start(&self) -> RuntimeResult<Option<oneshot::Receiver<()>>> {
        self.transition(ServerState::Configured, ServerState::Starting)?;
        let stopped = self.shutdown_rx.lock().take();

        let table = Arc::new(self.registry.compile(&self.middleware));
        let dispatcher = Dispatcher::new(
            Arc::clone(&table),
            Arc::clone(&self.transport),
            self.timeout,
            Arc::clone(&self.error_handler),
        );
        let callback = dispatcher.message_handler();

        for subject in table.subjects() {
            if let Err(source) = self
                .transport
                .subscribe(subject, &self.name, Arc::clone(&callback))
                .await
            {
                error!(subject, error = %source, "Subscription failed, stopping");
                self.transport.close().await;
                self.state
                    .store(ServerState::Stopped as u8, Ordering::SeqCst);
                self.state_changed.notify_waiters();
                return Err(RuntimeError::Subscribe {
                    subject: subject.to_string(),
                    source,
                });
            }
            debug!(subject, group = %self.name, "Subscribed");
        }

        self.transition(ServerState::Starting, ServerState::Running)?;
        info!(server = %self.name, subjects = table.len(), "Server running");
        Ok(stopped)
    }

    /// Flushes and closes the transport, then releases [`run`].
    ///
    /// `timeout` bounds the flush. If the flush fails or times out the
    /// transport stays open, the server keeps running and the error is
    /// returned. In-flight dispatches are not awaited.
    ///
    /// [`run`]: Server::run
    pub async fn shutdown(&self, timeout: Duration) -> RuntimeResult<()> {
        let state = self.state();
        if state != ServerState::Running {
            return Err(RuntimeError::InvalidState {
                expected: ServerState::Running,
                actual: state,
            });
        }

        info!(server = %self.name, "Shutting down");
        match tokio::time::timeout(timeout, self.transport.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Flush failed, server keeps running");
                return Err(RuntimeError::Shutdown(e));
            }
            Err(_) => {
                warn!(?timeout, "Flush timed out, server keeps running");
                return Err(RuntimeError::Shutdown(TransportError::FlushTimeout(
                    timeout,
                )));
            }
        }

        self.transition(ServerState::Running, ServerState::Stopped)?;
        self.transport.close().await;

        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        Ok(())
    }

    /// Runs until `signal` resolves, then shuts down.
    ///
    /// The signal is only watched once the server is running. The flush is
    /// bounded by the server's default timeout.
    pub async fn run_until<F>(&self, signal: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let stopped = self.start().await?;

        tokio::select! {
            biased;
            _ = async move {
                if let Some(stopped) = stopped {
                    let _ = stopped.await;
                }
            } => {}
            () = signal => self.shutdown(self.timeout).await?,
        }

        info!(server = %self.name, "Server stopped");
        Ok(())
    }

    /// Runs until Ctrl+C (or SIGTERM on unix), then shuts down.
    pub async fn run_until_ctrl_c(&self) -> RuntimeResult<()> {
        info!(server = %self.name, "Press Ctrl+C to stop");
        self.run_until(wait_for_signal()).await
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .field("subjects", &self.registry.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
