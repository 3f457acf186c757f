//! Transcript observers.

use chatstream_types::{SessionState, Transcript};
use tokio::sync::watch;

/// Receives transcript snapshots from a [`Conversation`](crate::Conversation).
///
/// Called outside the transcript lock, in delta order, on the task running
/// the session. Implementations should return quickly.
pub trait TranscriptObserver: Send + Sync {
    /// The transcript changed, or a session reached a terminal state.
    fn on_transcript_changed(&self, transcript: &Transcript);

    /// The conversation moved to `state`.
    fn on_state_changed(&self, _state: SessionState) {}
}

impl<F> TranscriptObserver for F
where
    F: Fn(&Transcript) + Send + Sync,
{
    fn on_transcript_changed(&self, transcript: &Transcript) {
        self(transcript);
    }
}

/// Publishes the latest snapshot and state on `watch` channels.
///
/// Renderers hold a receiver and redraw on change; intermediate snapshots
/// may be skipped if the renderer falls behind.
#[derive(Debug)]
pub struct SnapshotObserver {
    transcript: watch::Sender<Transcript>,
    state: watch::Sender<SessionState>,
}

impl SnapshotObserver {
    /// Create an observer holding an empty transcript and `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transcript: watch::Sender::new(Transcript::new()),
            state: watch::Sender::new(SessionState::Idle),
        }
    }

    /// Receiver for transcript snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.transcript.subscribe()
    }

    /// Receiver for state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Default for SnapshotObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptObserver for SnapshotObserver {
    fn on_transcript_changed(&self, transcript: &Transcript) {
        self.transcript.send_replace(transcript.clone());
    }

    fn on_state_changed(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}
