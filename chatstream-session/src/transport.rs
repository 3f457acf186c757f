//! The transport seam between a session and the network.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use chatstream_types::{ChatTurn, TransportError};
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use serde::Serialize;

/// Response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Body of a chat request: the whole conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// Every turn in order, ending with the new user turn.
    pub messages: Vec<ChatTurn>,
}

impl ChatRequest {
    /// Create a request carrying `messages`.
    #[must_use]
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self { messages }
    }
}

/// Status, headers and optional body of an opened request.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Streamed body, `None` if the response has none.
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    /// Create a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: Option<ByteStream>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the body as text, giving up once it exceeds `limit` bytes.
    /// A missing body reads as empty.
    pub async fn text(self, limit: usize) -> Result<String, TransportError> {
        let Some(mut body) = self.body else {
            return Ok(String::new());
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            bytes.extend_from_slice(&chunk?);
            if bytes.len() > limit {
                return Err(TransportError::Stream(format!(
                    "response body exceeds {limit} bytes"
                )));
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Opens chat requests.
///
/// Implementations send the request and return as soon as the status is
/// known; the body is read lazily through [`TransportResponse::body`].
pub trait Transport: Send + Sync {
    /// Send `request` and return the response head with its body stream.
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}
