//! HTTP transport built on `reqwest`.

use chatstream_types::TransportError;
use futures::TryStreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::{ConfigError, map_reqwest_error};
use crate::transport::{ChatRequest, Transport, TransportResponse};

/// Environment variable holding the chat endpoint URL.
pub const URL_ENV: &str = "CHATSTREAM_URL";

/// Environment variable holding the optional bearer token.
pub const API_KEY_ENV: &str = "CHATSTREAM_API_KEY";

/// POSTs chat requests as JSON and streams the response body.
///
/// # Example
///
/// ```no_run
/// use chatstream_session::HttpTransport;
///
/// let transport = HttpTransport::new("http://localhost:8080/api/chat")
///     .api_key("sk-...");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    pub(crate) url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport posting to `url`, without authentication.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a preconfigured client (proxies, timeouts, TLS roots).
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Endpoint this transport posts to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build from `CHATSTREAM_URL` and, if set, `CHATSTREAM_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let url = non_blank(URL_ENV).ok_or(ConfigError::MissingVar(URL_ENV))?;
        let mut transport = Self::new(url);
        if let Some(key) = non_blank(API_KEY_ENV) {
            transport = transport.api_key(key);
        }
        Ok(transport)
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        let url = self.url.clone();
        let api_key = self.api_key.clone();
        let client = self.client.clone();
        let messages = request.messages.len();
        let body = serde_json::to_value(request);

        async move {
            let body = body.map_err(|e| {
                TransportError::InvalidRequest(format!("request serialization: {e}"))
            })?;

            tracing::debug!(url = %url, messages, "sending chat request");

            let mut builder = client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "text/event-stream")
                .json(&body);
            if let Some(key) = &api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();

            tracing::debug!(
                status,
                content_type = ?headers.get(CONTENT_TYPE),
                "chat response received"
            );

            let body = response.bytes_stream().map_err(map_reqwest_error);
            Ok(TransportResponse {
                status,
                headers,
                body: Some(Box::pin(body)),
            })
        }
    }
}
