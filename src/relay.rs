use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use crate::config::UiConfig;
use crate::error::RelayError;
use crate::models::{ChatRequest, ChatResponse, ErrorBody};

/// Where the frontend sends chat requests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, RelayError>;
}

/// HTTP client for the `/chat` endpoint.
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(backend_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: format!("{}/chat/", backend_url.trim_end_matches('/')),
        }
    }

    pub fn from_config(config: &UiConfig) -> Self {
        Self::new(&config.backend_url, config.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for RelayClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(endpoint = %self.endpoint, history = request.history.len(), "sending chat request");
        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // Prefer the endpoint's `{error}` body; fall back to whatever came back.
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(RelayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ChatResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_trailing_slash_route() {
        let client = RelayClient::new("http://localhost:8000/", Duration::from_secs(1));
        assert_eq!(client.endpoint(), "http://localhost:8000/chat/");
    }
}
