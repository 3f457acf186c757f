//! Conversation types: roles, turns and the transcript.

use serde::{Deserialize, Serialize};

use crate::error::TranscriptError;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The model.
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote the turn.
    pub role: Role,
    /// Text of the turn.
    pub content: String,
}

impl ChatTurn {
    /// Create a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only list of turns.
///
/// The only in-place mutation allowed is growing the content of an
/// assistant turn through [`Transcript::extend_turn`]. Cloning a transcript
/// yields the immutable snapshot handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the transcript has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Append a turn and return its index.
    pub fn push(&mut self, turn: ChatTurn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// Append `text` to the assistant turn at `index`.
    ///
    /// Content only ever grows; user turns can't be extended.
    pub fn extend_turn(&mut self, index: usize, text: &str) -> Result<(), TranscriptError> {
        let turn = self
            .turns
            .get_mut(index)
            .ok_or(TranscriptError::NoSuchTurn(index))?;
        if turn.role != Role::Assistant {
            return Err(TranscriptError::NotAssistant(index));
        }
        turn.content.push_str(text);
        Ok(())
    }

    /// Consume the transcript, returning its turns.
    #[must_use]
    pub fn into_turns(self) -> Vec<ChatTurn> {
        self.turns
    }
}

impl From<Vec<ChatTurn>> for Transcript {
    fn from(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }
}

/// Lifecycle of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No exchange has started yet.
    #[default]
    Idle,
    /// Request sent, waiting for the response head.
    Requesting,
    /// Reading the response body.
    Streaming,
    /// The assistant turn finished and was closed.
    Completed,
    /// The exchange failed and a synthetic error turn was appended.
    Failed,
}

impl SessionState {
    /// Whether this state ends an exchange.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
