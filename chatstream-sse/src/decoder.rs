//! The full byte-to-delta pipeline.

use chatstream_types::{Delta, ParseOutcome, StreamEvent};

use crate::event::{classify_line, extract_delta};
use crate::framer::LineFramer;
use crate::utf8::Utf8Decoder;

/// Bounds on split-payload recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// How many continuation lines may be merged into one cut payload
    /// before it is given up as malformed. `0` disables recovery.
    pub max_rollbacks: usize,
    /// Largest pending payload kept while waiting for its continuation.
    pub max_pending_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_rollbacks: 8,
            max_pending_bytes: 64 * 1024,
        }
    }
}

/// Item produced by [`SseDecoder::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A parsed data event. May carry empty text.
    Delta(Delta),
    /// The `[DONE]` sentinel. Nothing follows it.
    Done,
    /// An error object sent inside the stream.
    ServerError(String),
}

/// Counters for faults the decoder absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Data payloads skipped as malformed, including abandoned rollbacks.
    pub malformed: usize,
    /// Cut payloads later completed by a continuation line.
    pub recovered: usize,
}

/// Content lost because the stream ended early.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Truncation {
    /// Size of a cut payload still waiting for its continuation.
    pub pending_payload_bytes: usize,
    /// Size of the trailing text that never received a newline.
    pub unterminated_bytes: usize,
}

/// A cut payload waiting for the rest of its JSON object.
#[derive(Debug)]
struct Pending {
    payload: String,
    merges: usize,
}

/// Incremental decoder from response body bytes to [`Decoded`] items.
///
/// Chains [`Utf8Decoder`], [`LineFramer`], [`classify_line`] and
/// [`extract_delta`]. When a payload's JSON ends early it is held back and
/// the next continuation line is appended to it before parsing again;
/// blank lines keep it waiting and a new field line abandons it.
///
/// ```
/// use chatstream_sse::{Decoded, SseDecoder};
///
/// let mut decoder = SseDecoder::new();
/// let mut out = decoder.feed(b"data: {\"choices\":[{\"delta\":");
/// out.extend(decoder.feed(b"{\"content\":\"Hi\"}}]}\n"));
/// assert!(matches!(&out[..], [Decoded::Delta(d)] if d.text == "Hi"));
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    config: DecoderConfig,
    utf8: Utf8Decoder,
    framer: LineFramer,
    pending: Option<Pending>,
    stats: DecoderStats,
    done: bool,
}

impl SseDecoder {
    /// Create a decoder with default recovery bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with explicit recovery bounds.
    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Feed one chunk of the response body.
    ///
    /// Returns the items completed by this chunk, in line order. After
    /// [`Decoded::Done`] has been returned, further input is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Decoded> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }

        let text = self.utf8.decode(chunk);
        self.framer.push(&text);
        while let Some(line) = self.framer.next_line() {
            self.handle_line(&line, &mut out);
            if self.done {
                break;
            }
        }
        out
    }

    /// Whether the sentinel has been seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Faults absorbed so far.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// End of stream.
    ///
    /// Drops any pending payload and unterminated line. Returns what was
    /// lost, or `None` if the stream ended cleanly.
    pub fn finish(&mut self) -> Option<Truncation> {
        let tail = self.utf8.finish();
        self.framer.push(&tail);
        let unterminated_bytes = self.framer.finish().map_or(0, |text| text.len());
        let pending_payload_bytes = self.pending.take().map_or(0, |p| p.payload.len());

        if self.done || (unterminated_bytes == 0 && pending_payload_bytes == 0) {
            return None;
        }

        tracing::warn!(
            pending_payload_bytes,
            unterminated_bytes,
            "stream ended with undelivered content"
        );
        Some(Truncation {
            pending_payload_bytes,
            unterminated_bytes,
        })
    }

    fn handle_line(&mut self, line: &str, out: &mut Vec<Decoded>) {
        tracing::trace!(line, "framed line");

        if let Some(pending) = self.pending.take() {
            if is_continuation(line) {
                let mut payload = pending.payload;
                payload.push_str(line);
                self.interpret(payload, pending.merges + 1, out);
                return;
            }
            if line.trim().is_empty() {
                self.pending = Some(pending);
                return;
            }
            tracing::debug!(
                bytes = pending.payload.len(),
                "abandoning cut payload superseded by a new field"
            );
            self.stats.malformed += 1;
        }

        match classify_line(line) {
            StreamEvent::Ignorable => {}
            StreamEvent::Sentinel => {
                self.done = true;
                out.push(Decoded::Done);
            }
            StreamEvent::Data(payload) => self.interpret(payload, 0, out),
        }
    }

    fn interpret(&mut self, payload: String, merges: usize, out: &mut Vec<Decoded>) {
        match extract_delta(&payload) {
            ParseOutcome::Parsed(delta) => {
                if merges > 0 {
                    self.stats.recovered += 1;
                }
                out.push(Decoded::Delta(delta));
            }
            ParseOutcome::Rollback(payload) => {
                if merges < self.config.max_rollbacks
                    && payload.len() <= self.config.max_pending_bytes
                {
                    self.pending = Some(Pending { payload, merges });
                } else {
                    tracing::debug!(
                        bytes = payload.len(),
                        merges,
                        "giving up on cut payload"
                    );
                    self.stats.malformed += 1;
                }
            }
            ParseOutcome::Skip => self.stats.malformed += 1,
            ParseOutcome::ServerError(message) => out.push(Decoded::ServerError(message)),
        }
    }
}

/// Whether `line` can be the rest of a cut payload rather than a new field.
fn is_continuation(line: &str) -> bool {
    const FIELDS: [&str; 4] = ["data:", "event:", "id:", "retry:"];

    !line.trim().is_empty()
        && !line.starts_with(':')
        && !FIELDS.iter().any(|field| line.starts_with(field))
}
