#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod accumulator;
pub mod config;
pub mod conversation;
mod error;
pub mod http;
pub mod observer;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use accumulator::MessageAccumulator;
pub use config::SessionConfig;
pub use conversation::{Conversation, Submission};
pub use error::ConfigError;
pub use http::HttpTransport;
pub use observer::{SnapshotObserver, TranscriptObserver};
pub use session::SessionReport;
pub use transport::{ByteStream, ChatRequest, Transport, TransportResponse};
