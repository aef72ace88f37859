//! Inbound request type.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::headers::Headers;
use super::message::Message;

/// An inbound unit of work.
///
/// Owns the originating [`Message`]; headers may be edited by middleware
/// before the handler sees them.
#[derive(Debug, Clone)]
pub struct Request {
    msg: Message,
}

impl Request {
    pub fn new(msg: Message) -> Self {
        Self { msg }
    }

    pub fn subject(&self) -> &str {
        &self.msg.subject
    }

    pub fn headers(&self) -> &Headers {
        &self.msg.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.msg.headers
    }

    /// Case-sensitive header lookup.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.msg.headers.get(key)
    }

    pub fn payload(&self) -> &Bytes {
        &self.msg.payload
    }

    /// Decodes the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.msg.payload)
    }

    /// The originating transport message.
    pub fn message(&self) -> &Message {
        &self.msg
    }

    pub fn into_message(self) -> Message {
        self.msg
    }
}

impl From<Message> for Request {
    fn from(msg: Message) -> Self {
        Self::new(msg)
    }
}
