//! Handler trait and type erasure.
//!
//! The registry stores handlers of different concrete types in one map, so
//! every handler is erased into a [`HandlerFunc`]:
//!
//! ```text
//! async fn add(ctx: Context, req: Request) -> Response { … }   ← user writes this
//!        ↓ server.handle("add", add)
//! add.into_handler_func()                                     ← Handler blanket impl
//!        ↓
//! Arc<dyn Fn(Context, Request) -> BoxFuture<Response>>        ← HandlerFunc
//! ```
//!
//! Middleware operates on `HandlerFunc`s directly, so a wrapped handler is
//! again a `HandlerFunc`.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
pub use futures::future::BoxFuture;

use crate::foundation::{Context, IntoResponse, Request, Response};

/// A type-erased handler shared across concurrent dispatches.
pub type HandlerFunc = Arc<dyn Fn(Context, Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Implemented for every valid request handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the shape:
///
/// ```text
/// async fn name(ctx: Context, req: Request) -> impl IntoResponse
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Erases the handler into a [`HandlerFunc`].
    fn into_handler_func(self) -> HandlerFunc;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn into_handler_func(self) -> HandlerFunc {
        Arc::new(move |ctx: Context, req: Request| {
            let fut = (self)(ctx, req);
            async move { fut.await.into_response() }.boxed()
        })
    }
}

/// Converts a handler function into a [`HandlerFunc`].
pub fn handler_fn<H: Handler>(handler: H) -> HandlerFunc {
    handler.into_handler_func()
}
