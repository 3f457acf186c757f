//! Session configuration.

use chatstream_sse::DecoderConfig;
use chatstream_types::TransportError;

/// Prefix of the synthetic assistant turn appended on failure.
pub const DEFAULT_ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

/// Message used when a rejected request carries no readable error.
pub const DEFAULT_FALLBACK_ERROR: &str = "Failed to connect to AI";

/// Largest error body read from a rejected request.
pub const DEFAULT_MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Configuration shared by every session of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Text placed before the error message in the synthetic turn.
    pub error_prefix: String,
    /// Message for a non-success status whose body has no `error` member.
    pub fallback_error: String,
    /// Error bodies longer than this are abandoned for `fallback_error`.
    pub max_error_body_bytes: usize,
    /// Bounds on split-payload recovery.
    pub decoder: DecoderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
            fallback_error: DEFAULT_FALLBACK_ERROR.to_string(),
            max_error_body_bytes: DEFAULT_MAX_ERROR_BODY_BYTES,
            decoder: DecoderConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Content of the synthetic assistant turn for `error`.
    #[must_use]
    pub fn error_turn(&self, error: &TransportError) -> String {
        format!("{}{}", self.error_prefix, error.user_message())
    }
}
