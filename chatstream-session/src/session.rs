//! One request/response exchange.
//!
//! ```text
//! Idle ──submit──▶ Requesting ──2xx + body──▶ Streaming ──[DONE] / EOF──▶ Completed
//!                      │                          │
//!                      └──── status / network ────┴── read error / server error ──▶ Failed
//! ```
//!
//! Both terminal states accept the next submission. A failed session never
//! leaves an open turn: partial content is kept and a synthetic assistant
//! turn carrying the error follows it.

use chatstream_sse::{Decoded, SseDecoder, Truncation, error_message};
use chatstream_types::{ChatTurn, Delta, SessionState, TransportError, Usage};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::accumulator::MessageAccumulator;
use crate::config::SessionConfig;
use crate::conversation::Shared;
use crate::transport::{ChatRequest, Transport};

/// Summary of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    /// `Completed` or `Failed`.
    pub state: SessionState,
    /// Non-empty deltas applied to the transcript.
    pub deltas: usize,
    /// Data payloads skipped as malformed.
    pub malformed: usize,
    /// Cut payloads recovered by merging a continuation line.
    pub recovered: usize,
    /// Content lost because the stream ended before `[DONE]`.
    pub truncation: Option<Truncation>,
    /// Last finish reason the server reported.
    pub finish_reason: Option<String>,
    /// Token usage, if the server reported it.
    pub usage: Option<Usage>,
    /// Why the session failed.
    pub error: Option<TransportError>,
}

impl SessionReport {
    /// Whether the session ended in `Completed`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }
}

/// Drives one exchange against the conversation's shared transcript.
pub(crate) struct StreamSession<'a, T> {
    transport: &'a T,
    config: &'a SessionConfig,
    shared: &'a Shared,
    cancel: CancellationToken,
    decoder: SseDecoder,
    accumulator: MessageAccumulator,
    deltas: usize,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

impl<'a, T: Transport> StreamSession<'a, T> {
    pub(crate) fn new(
        transport: &'a T,
        config: &'a SessionConfig,
        shared: &'a Shared,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            config,
            shared,
            cancel,
            decoder: SseDecoder::with_config(config.decoder),
            accumulator: MessageAccumulator::new(),
            deltas: 0,
            finish_reason: None,
            usage: None,
        }
    }

    /// Run to a terminal state. `None` if cancelled first.
    pub(crate) async fn run(mut self, request: ChatRequest) -> Option<SessionReport> {
        self.shared.set_state(SessionState::Requesting);

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return self.cancelled(),
            opened = self.transport.open(&request) => opened,
        };
        let response = match opened {
            Ok(response) => response,
            Err(e) => return Some(self.fail(e)),
        };

        if !response.is_success() {
            let status = response.status;
            let body = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.cancelled(),
                body = response.text(self.config.max_error_body_bytes) => body,
            };
            let message = body
                .ok()
                .as_deref()
                .and_then(error_message)
                .unwrap_or_else(|| self.config.fallback_error.clone());
            return Some(self.fail(TransportError::Status { status, message }));
        }

        let Some(mut body) = response.body else {
            return Some(self.fail(TransportError::MissingBody));
        };

        self.shared.set_state(SessionState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.cancelled(),
                next = body.next() => next,
            };
            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Some(self.fail(e)),
                None => break,
            };

            tracing::trace!(bytes = chunk.len(), "chunk received");
            for item in self.decoder.feed(&chunk) {
                // An observer may close the conversation mid-chunk.
                if self.cancel.is_cancelled() {
                    return self.cancelled();
                }
                match item {
                    Decoded::Delta(delta) => self.apply(delta),
                    Decoded::Done => return Some(self.complete(None)),
                    Decoded::ServerError(message) => {
                        return Some(self.fail(TransportError::Stream(message)));
                    }
                }
            }
        }

        let truncation = self.decoder.finish();
        Some(self.complete(truncation))
    }

    fn apply(&mut self, delta: Delta) {
        if delta.finish_reason.is_some() {
            self.finish_reason = delta.finish_reason;
        }
        if delta.usage.is_some() {
            self.usage = delta.usage;
        }

        let accumulator = &mut self.accumulator;
        if self.shared.update(|t| accumulator.apply(t, &delta.text)) {
            self.deltas += 1;
        }
    }

    fn complete(&mut self, truncation: Option<Truncation>) -> SessionReport {
        self.accumulator.close();
        tracing::debug!(
            deltas = self.deltas,
            truncated = truncation.is_some(),
            finish_reason = ?self.finish_reason,
            "chat session completed"
        );
        self.shared.notify();
        self.shared.set_state(SessionState::Completed);
        self.report(SessionState::Completed, truncation, None)
    }

    fn fail(&mut self, error: TransportError) -> SessionReport {
        self.accumulator.close();
        tracing::warn!(error = %error, deltas = self.deltas, "chat session failed");

        let content = self.config.error_turn(&error);
        self.shared.update(|t| {
            t.push(ChatTurn::assistant(content));
            true
        });
        self.shared.set_state(SessionState::Failed);
        self.report(SessionState::Failed, None, Some(error))
    }

    fn cancelled(&mut self) -> Option<SessionReport> {
        self.accumulator.close();
        tracing::debug!(deltas = self.deltas, "chat session cancelled");
        None
    }

    fn report(
        &mut self,
        state: SessionState,
        truncation: Option<Truncation>,
        error: Option<TransportError>,
    ) -> SessionReport {
        let stats = self.decoder.stats();
        SessionReport {
            state,
            deltas: self.deltas,
            malformed: stats.malformed,
            recovered: stats.recovered,
            truncation,
            finish_reason: self.finish_reason.take(),
            usage: self.usage.take(),
            error,
        }
    }
}
