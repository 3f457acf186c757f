//! Configuration errors and reqwest error mapping.

use chatstream_types::TransportError;

/// Invalid or missing transport configuration.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// Map a [`reqwest::Error`] to a [`TransportError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(Box::new(err))
    }
}
