//! Per-request tracing.

use std::time::Instant;

use gale_core::Middleware;
use tracing::{Instrument, info, info_span, warn};

/// Wraps each call in an `rpc` span and logs its latency and outcome.
///
/// Successful calls are logged at `info`, failed ones at `warn` with the
/// error message.
pub fn trace() -> Middleware {
    Middleware::from_fn(|ctx, req, next| async move {
        let span = info_span!("rpc", subject = %ctx.subject());
        let start = Instant::now();

        let resp = next.run(ctx, req).instrument(span.clone()).await;

        let latency_us = start.elapsed().as_micros() as u64;
        match &resp.error {
            Some(err) => warn!(parent: &span, latency_us, error = %err, "Request failed"),
            None => info!(parent: &span, latency_us, "Request handled"),
        }
        resp
    })
}
