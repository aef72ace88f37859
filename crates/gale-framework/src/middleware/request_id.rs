//! Request id propagation.

use gale_core::Middleware;
use uuid::Uuid;

/// Header carrying the request id, on both the request and the response.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// The id of the current request, stored in the context state bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Ensures every request carries an [`REQUEST_ID_HEADER`].
///
/// A caller-provided id is kept; otherwise a random v4 UUID is generated and
/// written into the request headers. The id is echoed on the response and
/// made available to handlers as [`RequestId`] state, since the context's
/// header view is fixed at dispatch time.
pub fn request_id() -> Middleware {
    Middleware::from_fn(|ctx, mut req, next| async move {
        let id = match req.header(REQUEST_ID_HEADER) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = Uuid::new_v4().to_string();
                req.headers_mut().insert(REQUEST_ID_HEADER, id.clone());
                id
            }
        };
        ctx.set_state(RequestId(id.clone()));

        let mut resp = next.run(ctx, req).await;
        resp.set_header(REQUEST_ID_HEADER, id);
        resp
    })
}
