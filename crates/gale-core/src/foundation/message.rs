//! The unit of data exchanged with a transport.

use bytes::Bytes;

use super::headers::Headers;

/// A message as seen on the wire.
///
/// Inbound requests carry the address their response must be sent to in
/// `reply`; outbound responses leave it empty and let the transport address
/// them from the original message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// The subject the message was published on.
    pub subject: String,
    /// Reply address, if the sender expects a response.
    pub reply: Option<String>,
    /// Per-call metadata.
    pub headers: Headers,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl Message {
    /// Creates a message on `subject` with the given payload.
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            headers: Headers::new(),
            payload: payload.into(),
        }
    }

    /// Sets the reply address.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Replaces all headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a single header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }
}
