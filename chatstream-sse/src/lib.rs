#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod decoder;
pub mod event;
pub mod framer;
pub mod utf8;

pub use decoder::{Decoded, DecoderConfig, DecoderStats, SseDecoder, Truncation};
pub use event::{DATA_PREFIX, DONE_SENTINEL, classify_line, error_message, extract_delta};
pub use framer::{LineFramer, Lines};
pub use utf8::Utf8Decoder;

// Re-export the shared types for convenience
pub use chatstream_types::{Delta, ParseOutcome, StreamEvent, Usage};
