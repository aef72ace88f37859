//! Outbound response type and the [`IntoResponse`] conversion.
//!
//! A handler failure is not a transport failure: it travels back to the
//! caller as an ordinary response whose [`ERROR_HEADER`] holds the error's
//! message. [`Response::into_message`] performs that encoding.

use bytes::Bytes;
use serde::Serialize;

use super::headers::{ERROR_HEADER, Headers};
use super::message::Message;
use crate::error::BoxError;

/// An outbound unit of work, paired one-to-one with a request.
#[derive(Debug, Default)]
pub struct Response {
    /// Response metadata.
    pub headers: Headers,
    /// Response payload.
    pub payload: Bytes,
    /// Handler-level failure, if any.
    pub error: Option<BoxError>,
}

impl Response {
    /// Creates an empty, successful response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a successful response carrying `payload`.
    pub fn from_bytes(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Creates a successful response with `value` encoded as JSON.
    ///
    /// A serialization failure yields an error response instead.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self::from_bytes(bytes),
            Err(e) => Self::error(e),
        }
    }

    /// Creates a failed response.
    pub fn error(err: impl Into<BoxError>) -> Self {
        Self {
            error: Some(err.into()),
            ..Self::default()
        }
    }

    /// Adds a header (builder style).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key, value);
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Encodes the response for the wire.
    ///
    /// The error, if present, is written under [`ERROR_HEADER`]. A successful
    /// response never carries that key.
    pub fn into_message(self) -> Message {
        let mut headers = self.headers;
        match self.error {
            Some(err) => {
                headers.insert(ERROR_HEADER, err.to_string());
            }
            None => {
                headers.remove(ERROR_HEADER);
            }
        }
        Message {
            subject: String::new(),
            reply: None,
            headers,
            payload: self.payload,
        }
    }

    /// Reads the error message a remote handler encoded into `headers`.
    pub fn error_from_headers(headers: &Headers) -> Option<&str> {
        headers.get(ERROR_HEADER)
    }
}

/// Conversion from handler return values into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::new()
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        Response::from_bytes(self)
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        Response::from_bytes(self)
    }
}

impl IntoResponse for BoxError {
    fn into_response(self) -> Response {
        Response {
            error: Some(self),
            ..Response::default()
        }
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn into_response(self) -> Response {
        match self {
            Ok(t) => t.into_response(),
            Err(e) => Response::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_encoded_in_header() {
        let msg = Response::error("division by zero").into_message();
        assert_eq!(msg.headers.get(ERROR_HEADER), Some("division by zero"));
        assert_eq!(
            Response::error_from_headers(&msg.headers),
            Some("division by zero")
        );
    }

    #[test]
    fn test_success_never_carries_error_key() {
        let msg = Response::json(&serde_json::json!({"result": 5}))
            .with_header(ERROR_HEADER, "stale")
            .into_message();
        assert!(!msg.headers.contains_key(ERROR_HEADER));
        assert_eq!(&msg.payload[..], br#"{"result":5}"#);
    }

    #[test]
    fn test_result_conversion() {
        let ok: Result<Response, String> = Ok(Response::from_bytes("hi"));
        assert!(!ok.into_response().is_error());

        let err: Result<Response, String> = Err("nope".to_string());
        let resp = err.into_response();
        assert_eq!(resp.error.map(|e| e.to_string()), Some("nope".to_string()));
    }
}
