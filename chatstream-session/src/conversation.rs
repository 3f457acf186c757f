//! The conversation controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatstream_types::{ChatTurn, SessionState, Transcript};
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::observer::TranscriptObserver;
use crate::session::{SessionReport, StreamSession};
use crate::transport::{ChatRequest, Transport};

/// What became of a [`Conversation::submit`] call.
#[derive(Debug)]
pub enum Submission {
    /// The session ran to `Completed` or `Failed`.
    Finished(SessionReport),
    /// The text was blank after trimming. Nothing changed.
    Empty,
    /// Another session is active. Nothing changed.
    Busy,
    /// The conversation was closed. Nothing changed.
    Closed,
    /// The conversation was closed while this session was running.
    Cancelled,
}

/// Transcript, state and observers shared between a conversation and its
/// running session.
pub(crate) struct Shared {
    transcript: Mutex<Transcript>,
    state: Mutex<SessionState>,
    observers: Vec<Arc<dyn TranscriptObserver>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            transcript: Mutex::new(Transcript::new()),
            state: Mutex::new(SessionState::Idle),
            observers: Vec::new(),
        }
    }

    pub(crate) fn add_observer(&mut self, observer: Arc<dyn TranscriptObserver>) {
        self.observers.push(observer);
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> Transcript {
        self.lock().clone()
    }

    /// Mutate the transcript under the lock; if `f` reports a change,
    /// notify observers with a snapshot taken before the lock is released.
    pub(crate) fn update(&self, f: impl FnOnce(&mut Transcript) -> bool) -> bool {
        let snapshot = {
            let mut transcript = self.lock();
            if !f(&mut transcript) {
                return false;
            }
            if self.observers.is_empty() {
                return true;
            }
            transcript.clone()
        };
        self.publish(&snapshot);
        true
    }

    /// Notify observers with the current transcript.
    pub(crate) fn notify(&self) {
        if !self.observers.is_empty() {
            let snapshot = self.snapshot();
            self.publish(&snapshot);
        }
    }

    fn publish(&self, snapshot: &Transcript) {
        for observer in &self.observers {
            observer.on_transcript_changed(snapshot);
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        for observer in &self.observers {
            observer.on_state_changed(state);
        }
    }
}

/// Clears the active flag when the session future ends or is dropped.
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A chat conversation: the transcript plus at most one running session.
///
/// `submit` takes `&self`, so a conversation can be shared behind an `Arc`
/// between the task streaming a reply and the one handling user input.
/// A submission made while a reply is streaming is rejected, not queued.
///
/// # Example
///
/// ```no_run
/// use chatstream_session::{Conversation, HttpTransport, SnapshotObserver};
///
/// let snapshots = SnapshotObserver::new();
/// let rx = snapshots.subscribe();
/// let conversation = Conversation::new(HttpTransport::new("http://localhost:8080/api/chat"))
///     .observer(snapshots);
/// ```
pub struct Conversation<T> {
    transport: T,
    config: SessionConfig,
    shared: Shared,
    active: AtomicBool,
    cancel: CancellationToken,
}

impl<T: Transport> Conversation<T> {
    /// Create an empty conversation over `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: SessionConfig::default(),
            shared: Shared::new(),
            active: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the session configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from earlier turns instead of an empty transcript.
    #[must_use]
    pub fn history(mut self, turns: Vec<ChatTurn>) -> Self {
        *self
            .shared
            .transcript
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Transcript::from(turns);
        self
    }

    /// Register an observer. Observers are called in registration order.
    #[must_use]
    pub fn observer(mut self, observer: impl TranscriptObserver + 'static) -> Self {
        self.shared.add_observer(Arc::new(observer));
        self
    }

    /// Register an observer that is also held elsewhere.
    #[must_use]
    pub fn shared_observer(mut self, observer: Arc<dyn TranscriptObserver>) -> Self {
        self.shared.add_observer(observer);
        self
    }

    /// Snapshot of the transcript.
    #[must_use]
    pub fn transcript(&self) -> Transcript {
        self.shared.snapshot()
    }

    /// State of the current or most recent session.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether a session is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the running session and refuse further submissions.
    ///
    /// The running session stops reading its body, emits no further
    /// observer calls and returns [`Submission::Cancelled`].
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(busy = self.is_busy(), "closing conversation");
            self.cancel.cancel();
        }
    }

    /// Submit a user turn and stream the reply.
    ///
    /// The trimmed text is appended as a user turn and the whole transcript
    /// is sent. Resolves once the session reaches a terminal state.
    pub async fn submit(&self, text: &str) -> Submission {
        let text = text.trim();
        if text.is_empty() {
            return Submission::Empty;
        }
        if self.is_closed() {
            return Submission::Closed;
        }
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("submission ignored, a session is already running");
            return Submission::Busy;
        }
        let _active = ActiveGuard(&self.active);

        self.shared.update(|t| {
            t.push(ChatTurn::user(text));
            true
        });
        let request = ChatRequest::new(self.shared.snapshot().into_turns());
        tracing::debug!(messages = request.messages.len(), "chat session started");

        let session = StreamSession::new(
            &self.transport,
            &self.config,
            &self.shared,
            self.cancel.clone(),
        );
        match session.run(request).await {
            Some(report) => Submission::Finished(report),
            None => Submission::Cancelled,
        }
    }
}

impl<T> std::fmt::Debug for Conversation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("turns", &self.shared.snapshot().len())
            .field("state", &self.shared.state())
            .field("busy", &self.active.load(Ordering::Acquire))
            .field("closed", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
