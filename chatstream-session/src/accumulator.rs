//! Growing the open assistant turn.

use chatstream_types::{ChatTurn, Transcript};

/// Tracks which assistant turn receives the deltas of the current session.
///
/// The first non-empty delta opens a new assistant turn; later deltas are
/// appended to it until [`close`](Self::close).
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    open: Option<usize>,
}

impl MessageAccumulator {
    /// Create an accumulator with no open turn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the open turn, if any.
    #[must_use]
    pub fn open_turn(&self) -> Option<usize> {
        self.open
    }

    /// Apply one delta. Returns whether `transcript` changed.
    ///
    /// Empty text changes nothing. If the remembered turn is gone or no
    /// longer an assistant turn, a fresh one is opened.
    pub fn apply(&mut self, transcript: &mut Transcript, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }

        if let Some(index) = self.open {
            match transcript.extend_turn(index, text) {
                Ok(()) => return true,
                Err(e) => tracing::warn!(error = %e, "open turn is gone, starting a new one"),
            }
        }

        self.open = Some(transcript.push(ChatTurn::assistant(text)));
        true
    }

    /// Make the open turn immutable. Returns its index.
    pub fn close(&mut self) -> Option<usize> {
        self.open.take()
    }
}
