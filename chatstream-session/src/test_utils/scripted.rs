//! ScriptedTransport: replays canned responses in order.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use chatstream_types::TransportError;
use futures::StreamExt;

use crate::transport::{ByteStream, ChatRequest, Transport, TransportResponse};

#[derive(Debug, Clone)]
enum Part {
    Bytes(Vec<u8>),
    Error(String),
}

/// One canned response.
#[derive(Debug, Clone)]
pub struct Script {
    status: u16,
    parts: Vec<Part>,
    has_body: bool,
    stall: bool,
    refuse: Option<String>,
}

impl Script {
    /// A `200 OK` response with an empty body.
    #[must_use]
    pub fn ok() -> Self {
        Self::status(200)
    }

    /// A response with the given status and an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            parts: Vec::new(),
            has_body: true,
            stall: false,
            refuse: None,
        }
    }

    /// `open` fails with a network error carrying `message`.
    #[must_use]
    pub fn refuse(message: impl Into<String>) -> Self {
        Self {
            refuse: Some(message.into()),
            ..Self::ok()
        }
    }

    /// Append one body chunk.
    #[must_use]
    pub fn chunk(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.parts.push(Part::Bytes(bytes.as_ref().to_vec()));
        self
    }

    /// Append a read error after the chunks so far.
    #[must_use]
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.parts.push(Part::Error(message.into()));
        self
    }

    /// Respond without a body.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.has_body = false;
        self
    }

    /// Keep the body open after the last chunk instead of ending it.
    #[must_use]
    pub fn stall(mut self) -> Self {
        self.stall = true;
        self
    }

    fn into_body(self) -> ByteStream {
        let items = self.parts.into_iter().map(|part| match part {
            Part::Bytes(bytes) => Ok(Bytes::from(bytes)),
            Part::Error(message) => Err(TransportError::Network(message.into())),
        });
        let body = futures::stream::iter(items);
        if self.stall {
            Box::pin(body.chain(futures::stream::pending()))
        } else {
            Box::pin(body)
        }
    }
}

/// A [`Transport`] that answers each request with the next [`Script`] and
/// records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    /// Create a transport with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    #[must_use]
    pub fn script(self, script: Script) -> Self {
        self.push(script);
        self
    }

    /// Queue a response on a shared transport.
    pub fn push(&self, script: Script) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(script);
    }

    /// Every request opened so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for ScriptedTransport {
    async fn open(&self, request: &ChatRequest) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let script = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| TransportError::InvalidRequest("no scripted response left".into()))?;

        if let Some(message) = &script.refuse {
            return Err(TransportError::Network(message.clone().into()));
        }

        let status = script.status;
        let body = script.has_body.then(|| script.into_body());
        Ok(TransportResponse::new(status, body))
    }
}
