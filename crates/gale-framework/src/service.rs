//! Tower integration.
//!
//! [`HandlerService`] exposes a [`HandlerFunc`] as a
//! `tower::Service<(Context, Request)>`, so existing tower layers can be
//! stacked on top of Gale handlers. [`layer`] turns such a layer back into a
//! [`Middleware`].
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use gale_framework::layer;
//!
//! let stamp = layer(
//!     ServiceBuilder::new()
//!         .map_response(|resp: Response| resp.with_header("X-Served-By", "gale"))
//!         .into_inner(),
//! );
//! server.use_middleware([stamp]);
//! ```

use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use gale_core::{BoxError, Context, HandlerFunc, Middleware, Request, Response};
use tower::{Service, ServiceExt};
use tower_layer::Layer;

/// A tower [`Service`] that calls a single [`HandlerFunc`].
///
/// Always ready. Handler failures are ordinary error responses, so the
/// service itself never returns `Err`; layers stacked above it may.
#[derive(Clone)]
pub struct HandlerService {
    handler: HandlerFunc,
}

impl HandlerService {
    pub fn new(handler: HandlerFunc) -> Self {
        Self { handler }
    }

    pub fn into_inner(self) -> HandlerFunc {
        self.handler
    }
}

impl From<HandlerFunc> for HandlerService {
    fn from(handler: HandlerFunc) -> Self {
        Self::new(handler)
    }
}

impl std::fmt::Debug for HandlerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerService").finish_non_exhaustive()
    }
}

impl Service<(Context, Request)> for HandlerService {
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, (ctx, req): (Context, Request)) -> Self::Future {
        let fut = (self.handler)(ctx, req);
        async move { Ok(fut.await) }.boxed()
    }
}

/// Adapts a tower [`Layer`] into a [`Middleware`].
///
/// The layer is applied once per handler when the server compiles its
/// handler table. An `Err` from the layered service becomes an error
/// response.
pub fn layer<L>(layer: L) -> Middleware
where
    L: Layer<HandlerService> + Send + Sync + 'static,
    L::Service: Service<(Context, Request), Response = Response> + Clone + Send + Sync + 'static,
    <L::Service as Service<(Context, Request)>>::Error: Into<BoxError> + Send,
    <L::Service as Service<(Context, Request)>>::Future: Send + 'static,
{
    Middleware::new(move |next: HandlerFunc| -> HandlerFunc {
        let svc = layer.layer(HandlerService::new(next));
        Arc::new(move |ctx: Context, req: Request| {
            let svc = svc.clone();
            async move {
                match svc.oneshot((ctx, req)).await {
                    Ok(resp) => resp,
                    Err(err) => Response::error(err),
                }
            }
            .boxed()
        })
    })
}
