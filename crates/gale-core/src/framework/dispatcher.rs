//! Per-message dispatcher.
//!
//! The [`Dispatcher`] is the callback a transport invokes for every inbound
//! message. For each message it:
//!
//! 1. Resolves the deadline (header first, default timeout otherwise)
//! 2. Builds a cancellable [`Context`] carrying the inbound headers
//! 3. Invokes the composed handler for the message's subject
//! 4. Encodes the [`Response`] and sends exactly one reply
//!
//! A failed reply is handed to the [`ErrorHandler`]; it is never retried and
//! never affects other dispatches.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tracing::{Instrument, Level, debug, span, warn};

use super::registry::HandlerTable;
use crate::error::TransportError;
use crate::foundation::{Context, Message, Request, Response, deadline};
use crate::integration::{BoxedTransport, MessageHandler};

/// Callback for transport-level failures during dispatch.
///
/// Never invoked for handler errors; those travel back to the caller in the
/// response.
pub type ErrorHandler = Arc<dyn Fn(&Context, &TransportError) + Send + Sync>;

/// An [`ErrorHandler`] that ignores every error.
pub fn noop_error_handler() -> ErrorHandler {
    Arc::new(|_: &Context, _: &TransportError| {})
}

/// Returned to the caller when a message arrives for a subject without a
/// handler.
#[derive(Debug, Clone, Error)]
#[error("no handler registered for subject '{0}'")]
pub struct NoHandler(pub String);

/// Serves inbound messages from a compiled [`HandlerTable`].
///
/// Cheap to clone; clones share the table, transport and error handler.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<HandlerTable>,
    transport: BoxedTransport,
    timeout: Duration,
    error_handler: ErrorHandler,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// `timeout` is the default applied when a message has no deadline
    /// header.
    pub fn new(
        table: Arc<HandlerTable>,
        transport: BoxedTransport,
        timeout: Duration,
        error_handler: ErrorHandler,
    ) -> Self {
        Self {
            table,
            transport,
            timeout,
            error_handler,
        }
    }

    /// Handles a single inbound message end to end.
    pub async fn dispatch(&self, msg: Message) {
        let span = span!(Level::DEBUG, "dispatch", subject = %msg.subject);
        self.serve(msg).instrument(span).await;
    }

    async fn serve(&self, msg: Message) {
        let at = deadline::resolve(&msg.headers, self.timeout);
        let (ctx, _scope) = Context::scoped(msg.subject.clone(), msg.headers.clone(), at);

        let original = msg.clone();

        let response = match self.table.get(&msg.subject) {
            Some(handler) => handler(ctx.clone(), Request::new(msg)).await,
            None => {
                warn!("No handler registered, rejecting message");
                Response::error(NoHandler(msg.subject))
            }
        };

        if let Some(err) = &response.error {
            debug!(error = %err, "Handler returned an error");
        }

        if let Err(err) = self.transport.respond(&original, response.into_message()).await {
            warn!(error = %err, "Failed to send response");
            (self.error_handler)(&ctx, &err);
        }
    }

    /// Adapts this dispatcher into a transport callback.
    pub fn message_handler(&self) -> MessageHandler {
        let this = self.clone();
        Arc::new(move |msg: Message| {
            let this = this.clone();
            async move { this.dispatch(msg).await }.boxed()
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.table.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::TransportResult;
    use crate::foundation::{DEADLINE_HEADER, ERROR_HEADER, Headers};
    use crate::framework::handler::handler_fn;
    use crate::framework::middleware::Middleware;
    use crate::framework::registry::Registry;
    use crate::integration::{MessageHandler, Transport};

    /// Records every reply instead of sending it.
    #[derive(Default)]
    struct RecordingTransport {
        replies: Mutex<Vec<(Message, Message)>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn subscribe(
            &self,
            _subject: &str,
            _group: &str,
            _handler: MessageHandler,
        ) -> TransportResult<()> {
            Ok(())
        }

        async fn respond(&self, original: &Message, response: Message) -> TransportResult<()> {
            self.replies.lock().push((original.clone(), response));
            if self.fail {
                Err(TransportError::SendFailed("wire cut".to_string()))
            } else {
                Ok(())
            }
        }

        async fn flush(&self) -> TransportResult<()> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn dispatcher(registry: &Registry, transport: Arc<RecordingTransport>) -> Dispatcher {
        Dispatcher::new(
            Arc::new(registry.compile(&[])),
            transport,
            Duration::from_secs(5),
            noop_error_handler(),
        )
    }

    fn request(subject: &str, payload: &'static str) -> Message {
        Message::new(subject, payload).with_reply("_INBOX.test")
    }

    #[tokio::test]
    async fn test_success_sends_one_reply_without_error_key() {
        let mut registry = Registry::new();
        registry.insert(
            "echo",
            handler_fn(|_ctx: Context, req: Request| async move {
                Response::from_bytes(req.payload().clone())
            }),
        );
        let transport = Arc::new(RecordingTransport::default());

        dispatcher(&registry, transport.clone())
            .dispatch(request("echo", "hello"))
            .await;

        let replies = transport.replies.lock();
        assert_eq!(replies.len(), 1);
        let (original, reply) = &replies[0];
        assert_eq!(original.reply.as_deref(), Some("_INBOX.test"));
        assert_eq!(&reply.payload[..], b"hello");
        assert!(!reply.headers.contains_key(ERROR_HEADER));
    }

    #[tokio::test]
    async fn test_error_sends_one_reply_with_error_key() {
        let mut registry = Registry::new();
        registry.insert(
            "fail",
            handler_fn(|_ctx: Context, _req: Request| async { Response::error("bad input") }),
        );
        let transport = Arc::new(RecordingTransport::default());

        dispatcher(&registry, transport.clone())
            .dispatch(request("fail", ""))
            .await;

        let replies = transport.replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].1.headers.get(ERROR_HEADER), Some("bad input"));
    }

    #[tokio::test]
    async fn test_unknown_subject_still_gets_one_reply() {
        let transport = Arc::new(RecordingTransport::default());

        dispatcher(&Registry::new(), transport.clone())
            .dispatch(request("missing", ""))
            .await;

        let replies = transport.replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(
            replies[0].1.headers.get(ERROR_HEADER),
            Some("no handler registered for subject 'missing'")
        );
    }

    #[tokio::test]
    async fn test_deadline_header_overrides_default() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let mut registry = Registry::new();
        registry.insert(
            "slow",
            handler_fn(move |ctx: Context, _req: Request| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    *seen.lock() = Some(ctx.deadline());
                    Response::new()
                }
            }),
        );
        let transport = Arc::new(RecordingTransport::default());

        let at = SystemTime::now() + Duration::from_secs(3600);
        let mut headers = Headers::new();
        deadline::set_deadline(&mut headers, at);
        let msg = request("slow", "").with_headers(headers);

        dispatcher(&registry, transport).dispatch(msg).await;

        assert_eq!(*seen.lock(), Some(at));
    }

    #[tokio::test]
    async fn test_default_deadline_is_now_plus_timeout() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let mut registry = Registry::new();
        registry.insert(
            "fast",
            handler_fn(move |ctx: Context, _req: Request| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    *seen.lock() = Some(ctx.deadline());
                    Response::new()
                }
            }),
        );
        let transport = Arc::new(RecordingTransport::default());

        let before = SystemTime::now();
        dispatcher(&registry, transport)
            .dispatch(request("fast", ""))
            .await;
        let after = SystemTime::now();

        let deadline = seen.lock().expect("handler ran");
        assert!(deadline >= before + Duration::from_secs(5));
        assert!(deadline <= after + Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_headers_reach_context() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let mut registry = Registry::new();
        registry.insert(
            "whoami",
            handler_fn(move |ctx: Context, _req: Request| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    *seen.lock() = ctx.header("X-User").map(str::to_string);
                    Response::new()
                }
            }),
        );
        let transport = Arc::new(RecordingTransport::default());

        let msg = request("whoami", "").with_header("X-User", "alice");
        dispatcher(&registry, transport).dispatch(msg).await;

        assert_eq!(seen.lock().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_context_is_cancelled_after_dispatch() {
        let token = Arc::new(Mutex::new(None));
        let token_clone = Arc::clone(&token);
        let mut registry = Registry::new();
        registry.insert(
            "t",
            handler_fn(move |ctx: Context, _req: Request| {
                let token = Arc::clone(&token_clone);
                async move {
                    assert!(!ctx.is_cancelled());
                    *token.lock() = Some(ctx.cancellation_token());
                    Response::new()
                }
            }),
        );
        let transport = Arc::new(RecordingTransport::default());

        dispatcher(&registry, transport).dispatch(request("t", "")).await;

        let token = token.lock().clone().expect("handler ran");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_respond_failure_goes_to_error_handler() {
        let mut registry = Registry::new();
        registry.insert(
            "fail",
            handler_fn(|_ctx: Context, _req: Request| async { Response::error("handler error") }),
        );
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let error_handler: ErrorHandler = Arc::new(move |ctx: &Context, err: &TransportError| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            seen_clone.lock().push((ctx.subject().to_string(), err.to_string()));
        });

        let dispatcher = Dispatcher::new(
            Arc::new(registry.compile(&[])),
            transport.clone(),
            Duration::from_secs(5),
            error_handler,
        );
        dispatcher.dispatch(request("fail", "")).await;

        // One attempt, no retry; the handler error itself is not reported.
        assert_eq!(transport.replies.lock().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock(),
            vec![(
                "fail".to_string(),
                "failed to send message: wire cut".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_middleware_sees_deadline_header() {
        let mut registry = Registry::new();
        registry.insert(
            "echo",
            handler_fn(|_ctx: Context, _req: Request| async { Response::new() }),
        );
        let copy_deadline = Middleware::from_fn(|ctx, req, next| async move {
            let has = req.headers().contains_key(DEADLINE_HEADER);
            next.run(ctx, req)
                .await
                .with_header("X-Had-Deadline", has.to_string())
        });
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(
            Arc::new(registry.compile(&[copy_deadline])),
            transport.clone(),
            Duration::from_secs(5),
            noop_error_handler(),
        );

        let mut headers = Headers::new();
        deadline::set_deadline(&mut headers, SystemTime::now() + Duration::from_secs(1));
        dispatcher
            .dispatch(request("echo", "").with_headers(headers))
            .await;

        let replies = transport.replies.lock();
        assert_eq!(replies[0].1.headers.get("X-Had-Deadline"), Some("true"));
    }

    #[tokio::test]
    async fn test_message_handler_dispatches() {
        let mut registry = Registry::new();
        registry.insert(
            "echo",
            handler_fn(|_ctx: Context, _req: Request| async { Response::from_bytes("ok") }),
        );
        let transport = Arc::new(RecordingTransport::default());
        let callback = dispatcher(&registry, transport.clone()).message_handler();

        callback(request("echo", "")).await;
        callback(request("echo", "")).await;

        assert_eq!(transport.replies.lock().len(), 2);
    }
}
