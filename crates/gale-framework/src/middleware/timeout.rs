//! Deadline enforcement.

use gale_core::{Middleware, Response};

use crate::error::DeadlineExceeded;

/// Stops waiting for the handler once the call's deadline passes.
///
/// The handler future is dropped and the caller receives a
/// [`DeadlineExceeded`] error instead. Handlers that finish in time are
/// unaffected.
pub fn timeout() -> Middleware {
    Middleware::from_fn(|ctx, req, next| async move {
        let remaining = ctx.remaining();
        match tokio::time::timeout(remaining, next.run(ctx, req)).await {
            Ok(resp) => resp,
            Err(_) => Response::error(DeadlineExceeded),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use gale_core::{Context, Headers, Message, Request, compose, handler_fn};

    use super::*;

    fn sleeper(delay: Duration) -> gale_core::HandlerFunc {
        handler_fn(move |_ctx: Context, _req: Request| async move {
            tokio::time::sleep(delay).await;
            Response::from_bytes("done")
        })
    }

    #[tokio::test]
    async fn test_slow_handler_is_cut_off() {
        let handler = compose(&[timeout()], sleeper(Duration::from_secs(30)));
        let ctx = Context::new(
            "slow",
            Headers::new(),
            SystemTime::now() + Duration::from_millis(20),
        );

        let resp = handler(ctx, Request::new(Message::new("slow", ""))).await;

        assert_eq!(
            resp.error.map(|e| e.to_string()),
            Some("deadline exceeded".to_string())
        );
    }

    #[tokio::test]
    async fn test_fast_handler_completes() {
        let handler = compose(&[timeout()], sleeper(Duration::from_millis(1)));
        let ctx = Context::new(
            "fast",
            Headers::new(),
            SystemTime::now() + Duration::from_secs(5),
        );

        let resp = handler(ctx, Request::new(Message::new("fast", ""))).await;

        assert_eq!(&resp.payload[..], b"done");
    }
}
