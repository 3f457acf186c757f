//! Line classification and payload extraction.
//!
//! Chat completion streams follow the text event-stream convention:
//!
//! ```text
//! : keep-alive comment
//! data: {"choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}
//!
//! data: [DONE]
//! ```
//!
//! Only `data: ` lines carry anything. `event:`, `id:` and `retry:` fields
//! are tolerated and ignored.

use chatstream_types::{Delta, ParseOutcome, StreamEvent, Usage};
use serde::Deserialize;

/// Prefix of a data line, including the single space.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends the assistant turn.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Message used when an in-stream error object carries no text.
const UNKNOWN_STREAM_ERROR: &str = "unknown streaming error";

/// Classify one framed line.
pub fn classify_line(line: &str) -> StreamEvent {
    if line.trim().is_empty() || line.starts_with(':') {
        return StreamEvent::Ignorable;
    }

    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return StreamEvent::Ignorable;
    };

    if rest.trim() == DONE_SENTINEL {
        StreamEvent::Sentinel
    } else {
        StreamEvent::Data(rest.to_string())
    }
}

/// One chunk of a streamed chat completion. Everything is optional: a chunk
/// may carry only a role, only a finish reason or only usage.
#[derive(Deserialize)]
struct ChunkBody {
    choices: Option<Vec<ChoiceBody>>,
    usage: Option<Usage>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ChoiceBody {
    delta: Option<DeltaBody>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct DeltaBody {
    content: Option<String>,
}

/// `"error"` member: either a bare string or an object with a message.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Text(String),
    Object { message: Option<String> },
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        let message = match self {
            ErrorBody::Text(text) => text,
            ErrorBody::Object { message } => message?,
        };
        (!message.trim().is_empty()).then_some(message)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

/// Interpret the payload of a [`StreamEvent::Data`] line.
///
/// The delta text lives at `choices[0].delta.content`; a missing path is an
/// empty delta, not an error. JSON that ends early yields
/// [`ParseOutcome::Rollback`] so the caller can wait for the rest of the
/// object; any other malformation yields [`ParseOutcome::Skip`].
pub fn extract_delta(payload: &str) -> ParseOutcome {
    if payload.trim().is_empty() {
        return ParseOutcome::Skip;
    }

    let chunk: ChunkBody = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) if e.is_eof() => {
            tracing::trace!(bytes = payload.len(), "payload ends mid-object");
            return ParseOutcome::Rollback(payload.to_string());
        }
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed payload");
            return ParseOutcome::Skip;
        }
    };

    if let Some(error) = chunk.error {
        let message = error
            .into_message()
            .unwrap_or_else(|| UNKNOWN_STREAM_ERROR.to_string());
        return ParseOutcome::ServerError(message);
    }

    let mut delta = Delta {
        usage: chunk.usage,
        ..Delta::default()
    };
    if let Some(choice) = chunk.choices.and_then(|choices| choices.into_iter().next()) {
        delta.text = choice
            .delta
            .and_then(|d| d.content)
            .unwrap_or_default();
        delta.finish_reason = choice.finish_reason;
    }

    ParseOutcome::Parsed(delta)
}

/// Pull a human-readable message out of an error response body.
///
/// Accepts `{"error":"..."}` and `{"error":{"message":"..."}}`. Returns
/// `None` when the body is empty, not JSON, or has no usable message.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .error?
        .into_message()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(payload: &str) -> Delta {
        match extract_delta(payload) {
            ParseOutcome::Parsed(delta) => delta,
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_comment_lines_are_ignorable() {
        assert_eq!(classify_line(""), StreamEvent::Ignorable);
        assert_eq!(classify_line("   "), StreamEvent::Ignorable);
        assert_eq!(classify_line(":heartbeat"), StreamEvent::Ignorable);
        assert_eq!(classify_line(": data: {}"), StreamEvent::Ignorable);
    }

    #[test]
    fn other_fields_are_ignorable() {
        assert_eq!(classify_line("event: message"), StreamEvent::Ignorable);
        assert_eq!(classify_line("id: 42"), StreamEvent::Ignorable);
        assert_eq!(classify_line("retry: 1000"), StreamEvent::Ignorable);
        // The prefix is literal, space included.
        assert_eq!(classify_line("data:{}"), StreamEvent::Ignorable);
    }

    #[test]
    fn done_is_sentinel() {
        assert_eq!(classify_line("data: [DONE]"), StreamEvent::Sentinel);
        assert_eq!(classify_line("data:  [DONE]  "), StreamEvent::Sentinel);
    }

    #[test]
    fn data_payload_is_kept_verbatim() {
        assert_eq!(
            classify_line("data:   {\"a\":1}  "),
            StreamEvent::Data("  {\"a\":1}  ".into())
        );
    }

    #[test]
    fn surrounding_whitespace_does_not_affect_parsing() {
        assert_eq!(parsed(" {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}  ").text, "Hi");
    }

    #[test]
    fn rollback_keeps_trailing_whitespace() {
        let payload = "{\"choices\":[{\"delta\":{\"content\":\"Hello ";
        assert_eq!(
            extract_delta(payload),
            ParseOutcome::Rollback(payload.to_string())
        );
    }

    #[test]
    fn extracts_content_of_first_choice() {
        let delta = parsed(r#"{"choices":[{"delta":{"content":"Hi"}},{"delta":{"content":"no"}}]}"#);
        assert_eq!(delta.text, "Hi");
    }

    #[test]
    fn missing_path_is_empty_delta() {
        assert!(parsed(r#"{"id":"chatcmpl-1"}"#).is_empty());
        assert!(parsed(r#"{"choices":[]}"#).is_empty());
        assert!(parsed(r#"{"choices":[{"delta":{}}]}"#).is_empty());
        assert!(parsed(r#"{"choices":[{"delta":{"role":"assistant","content":null}}]}"#).is_empty());
    }

    #[test]
    fn finish_reason_and_usage_are_carried() {
        let delta = parsed(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
        );
        assert!(delta.is_empty());
        assert_eq!(delta.finish_reason.as_deref(), Some("stop"));
        assert_eq!(
            delta.usage,
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 2
            })
        );
    }

    #[test]
    fn truncated_json_rolls_back() {
        let payload = r#"{"choices":[{"delta":"#;
        assert_eq!(
            extract_delta(payload),
            ParseOutcome::Rollback(payload.to_string())
        );
    }

    #[test]
    fn syntax_error_is_skipped() {
        assert_eq!(extract_delta("not json"), ParseOutcome::Skip);
        assert_eq!(extract_delta(r#"{"choices":[]} trailing"#), ParseOutcome::Skip);
    }

    #[test]
    fn wrong_shape_is_skipped() {
        assert_eq!(extract_delta(r#"{"choices":"nope"}"#), ParseOutcome::Skip);
        assert_eq!(
            extract_delta(r#"{"choices":[{"delta":{"content":5}}]}"#),
            ParseOutcome::Skip
        );
    }

    #[test]
    fn empty_payload_is_skipped() {
        assert_eq!(extract_delta(""), ParseOutcome::Skip);
    }

    #[test]
    fn error_object_is_server_error() {
        assert_eq!(
            extract_delta(r#"{"error":{"message":"Rate limit exceeded","type":"rate_limit_error"}}"#),
            ParseOutcome::ServerError("Rate limit exceeded".into())
        );
        assert_eq!(
            extract_delta(r#"{"error":"overloaded"}"#),
            ParseOutcome::ServerError("overloaded".into())
        );
        assert_eq!(
            extract_delta(r#"{"error":{"code":500}}"#),
            ParseOutcome::ServerError("unknown streaming error".into())
        );
    }

    #[test]
    fn error_message_accepts_both_shapes() {
        assert_eq!(
            error_message(r#"{"error":"rate limited"}"#).as_deref(),
            Some("rate limited")
        );
        assert_eq!(
            error_message(r#"{"error":{"message":"bad key"}}"#).as_deref(),
            Some("bad key")
        );
    }

    #[test]
    fn error_message_rejects_unusable_bodies() {
        assert_eq!(error_message(""), None);
        assert_eq!(error_message("<html>502</html>"), None);
        assert_eq!(error_message(r#"{"detail":"x"}"#), None);
        assert_eq!(error_message(r#"{"error":""}"#), None);
        assert_eq!(error_message(r#"{"error":{}}"#), None);
    }
}
