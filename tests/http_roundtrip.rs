//! End-to-end over loopback: terminal session -> relay client -> chat endpoint
//! -> Gemini client -> fake upstream.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use model_hub::config::CorsPolicy;
use model_hub::server::{cors_layer, router, AppState};
use model_hub::session::{SessionState, ERROR_PREFIX};
use model_hub::{
    ChatBackend, ChatRequest, ChatSession, CompletionBackend, GeminiClient, Message, RelayClient, RelayError,
    Role, UpstreamError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const KEY: &str = "test-key";

#[derive(Clone, Default)]
struct FakeUpstream {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    fail_with: Option<u16>,
    delay: Option<Duration>,
}

async fn generate_content(
    State(upstream): State<FakeUpstream>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let turns = body["contents"].as_array().map(Vec::len).unwrap_or(0);
    upstream.requests.lock().unwrap().push((target, key, body));

    if let Some(delay) = upstream.delay {
        tokio::time::sleep(delay).await;
    }

    if let Some(status) = upstream.fail_with {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, Json(json!({ "error": { "message": "quota exhausted" } })));
    }

    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": format!("reply to {turns} turns") }] },
                "finishReason": "STOP"
            }]
        })),
    )
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_upstream(upstream: FakeUpstream) -> String {
    let app = Router::new()
        .route("/v1beta/models/:target", post(generate_content))
        .with_state(upstream);
    format!("http://{}/v1beta", spawn(app).await)
}

fn gemini(base_url: String) -> GeminiClient {
    gemini_with_timeout(base_url, Duration::from_secs(5))
}

fn gemini_with_timeout(base_url: String, timeout: Duration) -> GeminiClient {
    GeminiClient::new(KEY.to_string(), base_url, "gemini-2.0-flash", timeout)
}

fn slow_upstream() -> FakeUpstream {
    FakeUpstream {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    }
}

async fn spawn_endpoint(gateway: GeminiClient) -> String {
    let app = router(AppState::new(Arc::new(gateway)), cors_layer(&CorsPolicy::Any));
    format!("http://{}", spawn(app).await)
}

#[tokio::test]
async fn gemini_client_sends_key_in_header_and_reads_reply() {
    let upstream = FakeUpstream::default();
    let client = gemini(spawn_upstream(upstream.clone()).await);

    let reply = client.get_completion("hello").await.unwrap();
    assert_eq!(reply, "reply to 1 turns");

    let requests = upstream.requests.lock().unwrap();
    let (target, key, body) = &requests[0];
    assert_eq!(target, "gemini-2.0-flash:generateContent");
    assert_eq!(key.as_deref(), Some(KEY));
    assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
}

#[tokio::test]
async fn gemini_client_reports_api_status() {
    let upstream = FakeUpstream {
        fail_with: Some(429),
        ..Default::default()
    };
    let client = gemini(spawn_upstream(upstream).await);

    match client.get_completion("hello").await {
        Err(UpstreamError::Api { status, body }) => {
            assert_eq!(status, 429);
            assert!(body.contains("quota exhausted"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_upstream_is_a_request_error() {
    // Bind then drop so the port is very likely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = gemini(format!("http://{addr}/v1beta"));
    assert!(matches!(
        client.get_completion("hello").await,
        Err(UpstreamError::Request(_))
    ));
}

#[tokio::test]
async fn session_round_trip_through_the_endpoint() {
    let upstream = FakeUpstream::default();
    let endpoint = spawn_endpoint(gemini(spawn_upstream(upstream.clone()).await)).await;
    let relay = RelayClient::new(&endpoint, Duration::from_secs(5));
    let mut session = ChatSession::default();

    session.send(&relay, "hello").await.unwrap();
    session.send(&relay, "bye").await.unwrap();

    assert_eq!(
        session.transcript().messages(),
        &[
            Message::user("hello"),
            Message::assistant("reply to 1 turns"),
            Message::user("bye"),
            Message::assistant("reply to 3 turns"),
        ]
    );

    let requests = upstream.requests.lock().unwrap();
    let (_, _, body) = &requests[1];
    assert_eq!(body["contents"][1]["role"], "model");
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "You are Gemini, Google's AI model."
    );
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 2000);

    drop(requests);
    assert_eq!(session.undo().unwrap(), 2);
    assert_eq!(session.transcript().len(), 2);
}

#[tokio::test]
async fn upstream_failure_reaches_the_ui_as_an_inline_message() {
    let upstream = FakeUpstream {
        fail_with: Some(403),
        ..Default::default()
    };
    let endpoint = spawn_endpoint(gemini(spawn_upstream(upstream).await)).await;
    let relay = RelayClient::new(&endpoint, Duration::from_secs(5));

    match relay.chat(&ChatRequest::new("hello")).await {
        Err(RelayError::Status { status, message }) => {
            assert_eq!(status, 502);
            assert!(message.contains("403"), "{message}");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let mut session = ChatSession::default();
    let reply = session.send(&relay, "hello").await.unwrap().clone();
    assert_eq!(reply.role, Role::Assistant);
    assert!(reply.content.starts_with(ERROR_PREFIX));
    assert_eq!(session.transcript().len(), 2);
}

#[tokio::test]
async fn slow_upstream_times_out_as_a_request_error() {
    let base_url = spawn_upstream(slow_upstream()).await;
    let client = gemini_with_timeout(base_url, Duration::from_millis(200));

    match client.get_completion("hello").await {
        Err(UpstreamError::Request(err)) => assert!(err.is_timeout(), "{err}"),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_upstream_is_a_bad_gateway_at_the_endpoint() {
    let base_url = spawn_upstream(slow_upstream()).await;
    let endpoint = spawn_endpoint(gemini_with_timeout(base_url, Duration::from_millis(200))).await;
    let relay = RelayClient::new(&endpoint, Duration::from_secs(5));

    match relay.chat(&ChatRequest::new("hello")).await {
        Err(RelayError::Status { status, .. }) => assert_eq!(status, 502),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_endpoint_times_out_in_the_relay_and_shows_inline() {
    let endpoint = spawn_endpoint(gemini(spawn_upstream(slow_upstream()).await)).await;
    let relay = RelayClient::new(&endpoint, Duration::from_millis(200));

    match relay.chat(&ChatRequest::new("hello")).await {
        Err(RelayError::Network(err)) => assert!(err.is_timeout(), "{err}"),
        other => panic!("expected timeout, got {other:?}"),
    }

    let mut session = ChatSession::default();
    let reply = session.send(&relay, "hello").await.unwrap().clone();
    assert!(reply.content.starts_with(ERROR_PREFIX));
    assert_eq!(session.active().state(), SessionState::Idle);
}
