//! Error types for all chatstream crates.

/// Failures of the transport or of the server behind it.
///
/// These are the only errors a user ever sees: the session turns them into
/// a synthetic assistant turn.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network-level error (connection reset, DNS failure, body read error).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, or the configured fallback.
        message: String,
    },
    /// The response had no readable body.
    #[error("No response body")]
    MissingBody,
    /// The request could not be built (bad header value, bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The server sent an error object inside the event stream.
    #[error("stream error: {0}")]
    Stream(String),
}

impl TransportError {
    /// The text shown to the user for this error.
    ///
    /// Server-supplied messages are shown verbatim; everything else uses the
    /// error's display form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } | Self::Stream(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether resubmitting the same turn might succeed.
    ///
    /// The session never retries on its own; this is a hint for the outer UI.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Stream(_) => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::MissingBody | Self::InvalidRequest(_) => false,
        }
    }
}

/// Invalid transcript mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// No turn exists at the index.
    #[error("no turn at index {0}")]
    NoSuchTurn(usize),
    /// The turn at the index was written by the user.
    #[error("turn {0} is not an assistant turn")]
    NotAssistant(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_user_message_is_server_text() {
        let err = TransportError::Status {
            status: 500,
            message: "rate limited".into(),
        };
        assert_eq!(err.user_message(), "rate limited");
        assert_eq!(err.to_string(), "HTTP 500: rate limited");
    }

    #[test]
    fn missing_body_user_message() {
        assert_eq!(TransportError::MissingBody.user_message(), "No response body");
    }

    #[test]
    fn network_user_message_uses_display() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = TransportError::Network(Box::new(io));
        assert_eq!(err.user_message(), "network error: reset by peer");
    }

    #[test]
    fn retryable_classification() {
        assert!(
            TransportError::Status {
                status: 429,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !TransportError::Status {
                status: 401,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(TransportError::Stream("overloaded".into()).is_retryable());
        assert!(!TransportError::MissingBody.is_retryable());
        assert!(!TransportError::InvalidRequest("bad header".into()).is_retryable());
    }

    #[test]
    fn transcript_error_display() {
        assert_eq!(TranscriptError::NoSuchTurn(2).to_string(), "no turn at index 2");
        assert_eq!(
            TranscriptError::NotAssistant(0).to_string(),
            "turn 0 is not an assistant turn"
        );
    }
}
