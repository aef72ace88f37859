//! In-process publish-subscribe broker.
//!
//! [`MemoryBroker`] models the subset of a message broker that Gale relies
//! on: subject subscriptions with queue groups, request/reply through private
//! inbox subjects, flushing and closing. It implements [`Connector`] for
//! `memory://` URLs, so a server can be pointed at it exactly like a networked
//! transport.
//!
//! Delivery rules:
//!
//! - Subscribers with an empty group each receive every message.
//! - Among subscribers sharing a non-empty group, each message goes to one
//!   member, chosen round-robin.
//! - Every delivery runs on its own tokio task.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use gale_core::{
    BoxedTransport, Connector, Headers, Message, MessageHandler, Transport, TransportError,
    TransportResult, deadline,
};

/// URL scheme accepted by [`MemoryBroker`].
pub const MEMORY_SCHEME: &str = "memory://";

const INBOX_PREFIX: &str = "_INBOX.";

struct Subscription {
    conn: u64,
    group: String,
    handler: MessageHandler,
}

#[derive(Default)]
struct BrokerInner {
    subscriptions: RwLock<HashMap<String, Vec<Subscription>>>,
    inboxes: Mutex<HashMap<String, oneshot::Sender<Message>>>,
    cursors: Mutex<HashMap<(String, String), usize>>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

impl BrokerInner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Delivers `msg` to the current subscribers of its subject.
    ///
    /// Returns the number of deliveries.
    fn publish(&self, msg: Message) -> usize {
        let targets = self.select_targets(&msg.subject);
        let delivered = targets.len();
        trace!(subject = %msg.subject, delivered, "Publishing");

        for handler in targets {
            let msg = msg.clone();
            tokio::spawn(async move { handler(msg).await });
        }
        delivered
    }

    fn select_targets(&self, subject: &str) -> Vec<MessageHandler> {
        let subscriptions = self.subscriptions.read();
        let Some(list) = subscriptions.get(subject) else {
            return Vec::new();
        };

        let mut targets = Vec::new();
        let mut groups: BTreeMap<&str, Vec<&MessageHandler>> = BTreeMap::new();
        for sub in list {
            if sub.group.is_empty() {
                targets.push(Arc::clone(&sub.handler));
            } else {
                groups.entry(sub.group.as_str()).or_default().push(&sub.handler);
            }
        }

        if !groups.is_empty() {
            let mut cursors = self.cursors.lock();
            for (group, members) in groups {
                let cursor = cursors
                    .entry((subject.to_string(), group.to_string()))
                    .or_insert(0);
                targets.push(Arc::clone(members[*cursor % members.len()]));
                *cursor = cursor.wrapping_add(1);
            }
        }
        targets
    }

    fn remove_connection(&self, conn: u64) {
        let mut subscriptions = self.subscriptions.write();
        for list in subscriptions.values_mut() {
            list.retain(|sub| sub.conn != conn);
        }
        subscriptions.retain(|_, list| !list.is_empty());
    }
}

/// An in-process message broker.
///
/// Cheap to clone; clones share the same subjects and connections.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `msg` without expecting a reply.
    ///
    /// Returns the number of subscribers the message was delivered to.
    pub fn publish(&self, msg: Message) -> usize {
        self.inner.publish(msg)
    }

    /// Sends a request and waits up to `timeout` for its reply.
    ///
    /// The request carries a deadline header of `now + timeout` unless
    /// `headers` already holds one.
    pub async fn request(
        &self,
        subject: &str,
        mut headers: Headers,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> TransportResult<Message> {
        if self.is_shut_down() {
            return Err(TransportError::ConnectionClosed);
        }
        if deadline::parse_deadline(&headers).is_none() {
            deadline::set_deadline(&mut headers, SystemTime::now() + timeout);
        }

        let inbox = format!("{INBOX_PREFIX}{}", self.inner.next_id());
        let (tx, rx) = oneshot::channel();
        self.inner.inboxes.lock().insert(inbox.clone(), tx);

        let msg = Message::new(subject, payload)
            .with_reply(inbox.clone())
            .with_headers(headers);
        if self.inner.publish(msg) == 0 {
            self.inner.inboxes.lock().remove(&inbox);
            return Err(TransportError::NoResponders {
                subject: subject.to_string(),
            });
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed),
            Err(_) => {
                self.inner.inboxes.lock().remove(&inbox);
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    /// Number of live subscriptions on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.inner
            .subscriptions
            .read()
            .get(subject)
            .map_or(0, Vec::len)
    }

    /// Refuses new connections and fails pending requests.
    ///
    /// Existing connections keep working until they are closed.
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        self.inner.inboxes.lock().clear();
        debug!("Memory broker shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Opens a new connection without going through a URL.
    pub fn connection(&self) -> TransportResult<MemoryConnection> {
        if self.is_shut_down() {
            return Err(TransportError::ConnectionFailed {
                url: MEMORY_SCHEME.to_string(),
                reason: "broker is shut down".to_string(),
            });
        }
        Ok(MemoryConnection {
            id: self.inner.next_id(),
            broker: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
        })
    }
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBroker")
            .field("subjects", &self.inner.subscriptions.read().len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    async fn connect(&self, url: &str) -> TransportResult<BoxedTransport> {
        if !url.starts_with(MEMORY_SCHEME) {
            return Err(TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("unsupported scheme, expected {MEMORY_SCHEME}"),
            });
        }
        let conn = self.connection().map_err(|_| TransportError::ConnectionFailed {
            url: url.to_string(),
            reason: "broker is shut down".to_string(),
        })?;
        debug!(url, conn = conn.id, "Memory connection opened");
        Ok(Arc::new(conn))
    }
}

/// A single client connection to a [`MemoryBroker`].
pub struct MemoryConnection {
    id: u64,
    broker: Arc<BrokerInner>,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.is_closed() {
            Err(TransportError::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Transport for MemoryConnection {
    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
        handler: MessageHandler,
    ) -> TransportResult<()> {
        self.ensure_open()?;
        if subject.is_empty() {
            return Err(TransportError::SubscribeFailed {
                subject: subject.to_string(),
                reason: "empty subject".to_string(),
            });
        }

        self.broker
            .subscriptions
            .write()
            .entry(subject.to_string())
            .or_default()
            .push(Subscription {
                conn: self.id,
                group: group.to_string(),
                handler,
            });
        debug!(conn = self.id, subject, group, "Subscribed");
        Ok(())
    }

    async fn respond(&self, original: &Message, mut response: Message) -> TransportResult<()> {
        self.ensure_open()?;
        let reply = original
            .reply
            .clone()
            .ok_or_else(|| TransportError::NoReplySubject {
                subject: original.subject.clone(),
            })?;
        response.subject = reply.clone();
        response.reply = None;

        let waiting = self.broker.inboxes.lock().remove(&reply);
        match waiting {
            // A dropped receiver means the requester gave up; the reply is lost.
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => {
                self.broker.publish(response);
            }
        }
        trace!(conn = self.id, reply = %reply, "Responded");
        Ok(())
    }

    async fn flush(&self) -> TransportResult<()> {
        // Deliveries are handed to tasks synchronously; nothing is buffered.
        self.ensure_open()
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.broker.remove_connection(self.id);
        debug!(conn = self.id, "Memory connection closed");
    }
}
