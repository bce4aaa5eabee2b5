use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::UpstreamError;
use crate::models::{Message, Role};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Everything the upstream model needs to produce one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Prior turns followed by the new user prompt.
    pub contents: Vec<Message>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Message::user(prompt)],
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;

    async fn get_completion(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.complete(&CompletionRequest::from_prompt(prompt)).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl From<&CompletionRequest> for GenerateContentRequest {
    fn from(request: &CompletionRequest) -> Self {
        let contents = request
            .contents
            .iter()
            .map(|message| Content {
                role: Some(
                    match message.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            })
            .collect();

        let system_instruction = request
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .map(|prompt| Content {
                role: None,
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            });

        Self {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, UpstreamError> {
        let block_reason = self.prompt_feedback.and_then(|feedback| feedback.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(UpstreamError::EmptyResponse {
                reason: block_reason.unwrap_or_else(|| "no candidates".to_string()),
            });
        };

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(UpstreamError::EmptyResponse {
                reason: candidate
                    .finish_reason
                    .unwrap_or_else(|| "empty candidate".to_string()),
            });
        }
        Ok(text)
    }
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.upstream_url.clone(),
            config.upstream_model.clone(),
            config.upstream_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let mut api_key = HeaderValue::from_str(&self.api_key).map_err(|_| UpstreamError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GenerateContentRequest::from(request);
        debug!(model = %self.model, turns = body.contents.len(), "calling upstream");

        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<GenerateContentResponse>().await?.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_maps_roles_and_settings() {
        let request = CompletionRequest {
            contents: vec![
                Message::user("hello"),
                Message::assistant("hi there"),
                Message::user("bye"),
            ],
            system_prompt: Some("You are Gemini, Google's AI model.".to_string()),
            temperature: Some(0.5),
            max_tokens: Some(300),
        };

        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "hello" }] },
                    { "role": "model", "parts": [{ "text": "hi there" }] },
                    { "role": "user", "parts": [{ "text": "bye" }] }
                ],
                "systemInstruction": { "parts": [{ "text": "You are Gemini, Google's AI model." }] },
                "generationConfig": { "temperature": 0.5, "maxOutputTokens": 300 }
            })
        );
    }

    #[test]
    fn bare_prompt_omits_optional_fields() {
        let body = serde_json::to_value(GenerateContentRequest::from(&CompletionRequest::from_prompt("hi"))).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "generationConfig": {}
            })
        );
    }

    #[test]
    fn blank_system_prompt_is_dropped() {
        let mut request = CompletionRequest::from_prompt("hi");
        request.system_prompt = Some("   ".to_string());
        let body = GenerateContentRequest::from(&request);
        assert!(body.system_instruction.is_none());
    }

    #[test]
    fn reply_parts_are_joined() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello" }, { "text": ", world" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Hello, world");
    }

    #[test]
    fn blocked_prompt_is_an_empty_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        match response.into_text() {
            Err(UpstreamError::EmptyResponse { reason }) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected empty response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unusable_api_key_fails_before_any_request() {
        let client = GeminiClient::new(
            "bad\nkey".to_string(),
            "http://127.0.0.1:9",
            "gemini-2.0-flash",
            Duration::from_secs(1),
        );
        assert!(matches!(
            client.get_completion("hi").await,
            Err(UpstreamError::InvalidApiKey)
        ));
    }

    #[test]
    fn candidate_without_text_is_an_empty_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        }))
        .unwrap();
        match response.into_text() {
            Err(UpstreamError::EmptyResponse { reason }) => assert_eq!(reason, "MAX_TOKENS"),
            other => panic!("expected empty response, got {other:?}"),
        }
    }
}
