//! Execution context handed to handlers and middleware.
//!
//! One [`Context`] is created per dispatch. It carries:
//!
//! - the subject being served,
//! - the resolved deadline and a cancellation token that fires when the
//!   deadline passes or the dispatch ends,
//! - the inbound headers, so handlers never have to re-parse the raw message,
//! - a typed state bag middleware can use to pass values downstream.
//!
//! Cancellation is advisory: handlers are expected to observe
//! [`Context::cancelled`] but nothing forces them to.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

use super::headers::Headers;

struct ContextInner {
    subject: String,
    deadline: SystemTime,
    headers: Headers,
    token: CancellationToken,
    state: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

/// The per-dispatch execution scope.
///
/// Cheap to clone; all clones share the same deadline, headers, token and
/// state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Creates a context without arming its deadline timer.
    ///
    /// The token only fires when cancelled explicitly. Use [`Context::scoped`]
    /// for a context whose token follows the deadline.
    pub fn new(subject: impl Into<String>, headers: Headers, deadline: SystemTime) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                subject: subject.into(),
                deadline,
                headers,
                token: CancellationToken::new(),
                state: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a context whose token is cancelled when `deadline` passes or
    /// when the returned [`ScopeGuard`] is dropped, whichever comes first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn scoped(
        subject: impl Into<String>,
        headers: Headers,
        deadline: SystemTime,
    ) -> (Self, ScopeGuard) {
        let ctx = Self::new(subject, headers, deadline);
        let token = ctx.inner.token.clone();

        let wait = deadline
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(wait) => timer.cancel(),
                () = timer.cancelled() => {}
            }
        });

        (ctx, ScopeGuard(token.drop_guard()))
    }

    /// The subject this dispatch serves.
    pub fn subject(&self) -> &str {
        &self.inner.subject
    }

    /// The absolute deadline of the call.
    pub fn deadline(&self) -> SystemTime {
        self.inner.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.inner
            .deadline
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }

    /// The inbound request headers.
    pub fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    /// Looks up a single inbound header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.inner.headers.get(key)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    /// Returns a clone of the underlying cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Cancels the scope early.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    /// Stores a value in the state bag. One value per type; later calls
    /// overwrite.
    pub fn set_state<T: Send + Sync + 'static>(&self, value: T) {
        self.inner
            .state
            .lock()
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a clone of the stored value of type `T`.
    pub fn get_state<T: Clone + 'static>(&self) -> Option<T> {
        self.inner
            .state
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn has_state<T: 'static>(&self) -> bool {
        self.inner.state.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn take_state<T: 'static>(&self) -> Option<T> {
        self.inner
            .state
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("subject", &self.inner.subject)
            .field("deadline", &self.inner.deadline)
            .field("headers", &self.inner.headers)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Ends a dispatch scope when dropped, cancelling its context.
#[must_use = "dropping the guard cancels the context immediately"]
pub struct ScopeGuard(DropGuard);

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_cancels_at_deadline() {
        let deadline = SystemTime::now() + Duration::from_millis(20);
        let (ctx, _guard) = Context::scoped("test", Headers::new(), deadline);

        assert!(!ctx.is_cancelled());
        tokio::time::timeout(Duration::from_secs(2), ctx.cancelled())
            .await
            .expect("deadline should cancel the scope");
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropping_guard_cancels() {
        let deadline = SystemTime::now() + Duration::from_secs(60);
        let (ctx, guard) = Context::scoped("test", Headers::new(), deadline);

        assert!(!ctx.is_cancelled());
        drop(guard);
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_past_deadline_cancels_immediately() {
        let deadline = SystemTime::now() - Duration::from_secs(1);
        let (ctx, _guard) = Context::scoped("test", Headers::new(), deadline);

        tokio::time::timeout(Duration::from_secs(2), ctx.cancelled())
            .await
            .expect("past deadline should cancel promptly");
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_headers_are_visible() {
        let headers: Headers = [("X-User", "alice")].into_iter().collect();
        let ctx = Context::new("users.get", headers, SystemTime::now());

        assert_eq!(ctx.subject(), "users.get");
        assert_eq!(ctx.header("X-User"), Some("alice"));
        assert_eq!(ctx.header("X-Missing"), None);
    }

    #[test]
    fn test_state_bag() {
        #[derive(Clone, Debug, PartialEq)]
        struct UserId(u64);

        let ctx = Context::new("test", Headers::new(), SystemTime::now());
        assert!(!ctx.has_state::<UserId>());

        ctx.set_state(UserId(7));
        let clone = ctx.clone();
        assert_eq!(clone.get_state::<UserId>(), Some(UserId(7)));

        assert_eq!(ctx.take_state::<UserId>(), Some(UserId(7)));
        assert!(!clone.has_state::<UserId>());
    }
}
