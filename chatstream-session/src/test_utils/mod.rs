//! In-memory transport for testing.
//!
//! Available behind the `test-utils` feature flag.

mod scripted;

pub use scripted::{Script, ScriptedTransport};

/// A `data:` line carrying one content delta, followed by a blank line.
#[must_use]
pub fn delta_line(text: &str) -> String {
    let chunk = serde_json::json!({ "choices": [{ "delta": { "content": text } }] });
    format!("data: {chunk}\n\n")
}
