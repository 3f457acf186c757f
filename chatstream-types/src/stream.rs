//! Streaming event types for incremental chat responses.

use serde::{Deserialize, Serialize};

/// Classification of one framed line of the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A `data: ` line; holds the payload after the prefix, untrimmed.
    Data(String),
    /// `data: [DONE]`, the logical end of the assistant turn.
    Sentinel,
    /// Blank lines, `:` comments, and any non-`data: ` field.
    Ignorable,
}

/// Token counts the server may attach to a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens generated so far.
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Incremental content from one data event.
///
/// `text` is empty when the event carried no content (role announcements,
/// finish markers, usage-only chunks).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Text to append to the open assistant turn.
    pub text: String,
    /// `finish_reason` of the first choice, when present.
    pub finish_reason: Option<String>,
    /// Usage statistics, when present.
    pub usage: Option<Usage>,
}

impl Delta {
    /// A delta carrying only text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether the delta adds no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// What a data payload turned out to be.
///
/// Parsing never mutates anything; the caller decides what to do with a
/// rollback or a skipped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Valid chunk.
    Parsed(Delta),
    /// The JSON ended early; the payload was probably cut mid-object and
    /// should be retried once its continuation arrives.
    Rollback(String),
    /// Malformed or wrongly shaped payload; contributes nothing.
    Skip,
    /// The server reported an error inside the stream.
    ServerError(String),
}
