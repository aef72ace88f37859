//! Middleware: handler decorators composed once at startup.
//!
//! A [`Middleware`] maps a [`HandlerFunc`] to a new `HandlerFunc`. Given the
//! sequence `[m1, m2]`, [`compose`] produces `m1(m2(handler))`: `m1` is the
//! outermost wrapper, so its pre-call logic runs first and its post-call
//! logic runs last.
//!
//! ```rust,ignore
//! use gale_core::{Middleware, Response};
//!
//! let stamp = Middleware::from_fn(|ctx, req, next| async move {
//!     let resp = next.run(ctx, req).await;
//!     resp.with_header("X-Served-By", "gale")
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::handler::HandlerFunc;
use crate::foundation::{Context, Request, Response};

/// A handler decorator.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync>);

impl Middleware {
    /// Creates a middleware from a raw decorator function.
    pub fn new<F>(decorator: F) -> Self
    where
        F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
    {
        Self(Arc::new(decorator))
    }

    /// Creates a middleware from an async function that receives the rest of
    /// the chain as [`Next`].
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |next: HandlerFunc| -> HandlerFunc {
            let f = Arc::clone(&f);
            Arc::new(move |ctx: Context, req: Request| {
                f(ctx, req, Next(Arc::clone(&next))).boxed()
            })
        })
    }

    /// Wraps `handler`.
    pub fn wrap(&self, handler: HandlerFunc) -> HandlerFunc {
        (self.0)(handler)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// The remainder of a middleware chain.
#[derive(Clone)]
pub struct Next(HandlerFunc);

impl Next {
    /// Calls the next middleware, or the handler at the end of the chain.
    pub fn run(self, ctx: Context, req: Request) -> BoxFuture<'static, Response> {
        (self.0)(ctx, req)
    }

    /// Returns the wrapped handler.
    pub fn into_inner(self) -> HandlerFunc {
        self.0
    }
}

/// Applies `middleware` to `handler`, first element outermost.
pub fn compose(middleware: &[Middleware], handler: HandlerFunc) -> HandlerFunc {
    middleware.iter().rev().fold(handler, |inner, mw| mw.wrap(inner))
}
