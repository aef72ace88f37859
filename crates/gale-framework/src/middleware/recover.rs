//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use gale_core::{Middleware, Response};
use tracing::error;

use crate::error::HandlerPanicked;

/// Converts a panicking handler into an error response.
///
/// Without it, a panic unwinds the dispatch task and the caller gets no reply
/// until its own timeout fires.
pub fn recover() -> Middleware {
    Middleware::from_fn(|ctx, req, next| async move {
        let subject = ctx.subject().to_string();
        match AssertUnwindSafe(next.run(ctx, req)).catch_unwind().await {
            Ok(resp) => resp,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(subject = %subject, panic = %message, "Handler panicked");
                Response::error(HandlerPanicked(message))
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use gale_core::{Context, Headers, Message, Request, compose, handler_fn};

    use super::*;

    fn call(handler: gale_core::HandlerFunc) -> Response {
        let ctx = Context::new("boom", Headers::new(), SystemTime::now());
        tokio_test::block_on(handler(ctx, Request::new(Message::new("boom", ""))))
    }

    #[test]
    fn test_panic_becomes_error_response() {
        let handler = compose(
            &[recover()],
            handler_fn(|_ctx: Context, _req: Request| async {
                if true {
                    panic!("kaboom");
                }
                Response::new()
            }),
        );

        let resp = call(handler);
        assert_eq!(
            resp.error.map(|e| e.to_string()),
            Some("handler panicked: kaboom".to_string())
        );
    }

    #[test]
    fn test_formatted_panic_message() {
        let handler = compose(
            &[recover()],
            handler_fn(|_ctx: Context, req: Request| async move {
                if req.payload().is_empty() {
                    panic!("empty payload on {}", req.subject());
                }
                Response::new()
            }),
        );

        let resp = call(handler);
        assert_eq!(
            resp.error.map(|e| e.to_string()),
            Some("handler panicked: empty payload on boom".to_string())
        );
    }

    #[test]
    fn test_normal_response_untouched() {
        let handler = compose(
            &[recover()],
            handler_fn(|_ctx: Context, _req: Request| async { Response::from_bytes("fine") }),
        );
        let resp = call(handler);
        assert_eq!(&resp.payload[..], b"fine");
        assert!(!resp.is_error());
    }
}
