//! HTTP front of the relay: `POST /chat` in, one upstream completion out.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::client::{CompletionBackend, CompletionRequest, GeminiClient};
use crate::config::{CorsPolicy, ServerConfig};
use crate::error::{UpstreamError, ValidationError};
use crate::models::{ChatRequest, ChatResponse, ErrorBody, Message, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::session::{MAX_TOKENS_RANGE, TEMPERATURE_RANGE};

/// Model aliases the endpoint accepts in the optional `model` field.
pub const SERVED_MODELS: &[&str] = &["gemini"];

#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn CompletionBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationError::Body(rejection.body_text()))
    }
}

/// Checks a wire request and turns it into an upstream completion request.
pub fn validate(request: ChatRequest) -> Result<CompletionRequest, ValidationError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }

    if let Some(model) = request.model.as_deref() {
        if !SERVED_MODELS.contains(&model) {
            return Err(ValidationError::UnsupportedModel(model.to_string()));
        }
    }

    let temperature = request.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(ValidationError::Temperature {
            value: temperature,
            min: *TEMPERATURE_RANGE.start(),
            max: *TEMPERATURE_RANGE.end(),
        });
    }

    let max_tokens = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if !MAX_TOKENS_RANGE.contains(&max_tokens) {
        return Err(ValidationError::MaxTokens {
            value: max_tokens,
            min: *MAX_TOKENS_RANGE.start(),
            max: *MAX_TOKENS_RANGE.end(),
        });
    }

    let mut contents = request.history;
    contents.push(Message::user(message));

    Ok(CompletionRequest {
        contents,
        system_prompt: request.system_prompt,
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
    })
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected chat request body");
        ApiError::from(rejection)
    })?;

    let completion = validate(request).map_err(|err| {
        warn!(error = %err, "invalid chat request");
        err
    })?;

    match state.backend.complete(&completion).await {
        Ok(response) => {
            info!(turns = completion.contents.len(), chars = response.len(), "chat reply sent");
            Ok(Json(ChatResponse { response }))
        }
        Err(err) => {
            error!(error = %err, "upstream call failed");
            Err(err.into())
        }
    }
}

pub fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    match policy {
        CorsPolicy::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsPolicy::Origins(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::POST])
                .allow_headers([header::CONTENT_TYPE])
        }
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/", post(chat))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    if config.cors == CorsPolicy::Any {
        warn!("CORS is open to any origin; set MODEL_HUB_CORS_ORIGINS outside local development");
    }

    let gateway = GeminiClient::from_config(&config);
    info!(model = %gateway.model(), "upstream gateway ready");

    let app = router(AppState::new(Arc::new(gateway)), cors_layer(&config.cors));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "chat endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
