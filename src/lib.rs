#![deny(missing_docs)]
//! # chatstream: umbrella crate
//!
//! Single import surface for the chatstream workspace: shared types, the
//! byte-to-delta decoding pipeline and streaming chat sessions, plus a
//! `prelude` for the happy path.

pub use chatstream_session;
pub use chatstream_sse;
pub use chatstream_types;

/// Happy-path imports for running a streaming conversation.
pub mod prelude {
    pub use chatstream_session::{
        Conversation, HttpTransport, SessionConfig, SessionReport, SnapshotObserver, Submission,
        Transport, TranscriptObserver,
    };
    pub use chatstream_sse::{Decoded, DecoderConfig, SseDecoder, Truncation};
    pub use chatstream_types::{ChatTurn, Role, SessionState, Transcript, TransportError};
}
