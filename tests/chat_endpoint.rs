use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use model_hub::config::CorsPolicy;
use model_hub::server::{cors_layer, router, AppState};
use model_hub::{CompletionBackend, CompletionRequest, Message, UpstreamError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

enum Reply {
    Text(&'static str),
    QuotaExceeded,
}

struct StubGateway {
    reply: Reply,
    seen: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl CompletionBackend for StubGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        self.seen.lock().unwrap().push(request.clone());
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::QuotaExceeded => Err(UpstreamError::Api {
                status: 429,
                body: "RESOURCE_EXHAUSTED".to_string(),
            }),
        }
    }
}

fn app(reply: Reply) -> (Router, Arc<StubGateway>) {
    let gateway = Arc::new(StubGateway {
        reply,
        seen: Mutex::new(Vec::new()),
    });
    let app = router(AppState::new(gateway.clone()), cors_layer(&CorsPolicy::Any));
    (app, gateway)
}

async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn successful_upstream_call_returns_response() {
    let (app, gateway) = app(Reply::Text("Hello from Gemini"));
    let (status, body) = post(app, "/chat", json!({ "message": "hello" }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "response": "Hello from Gemini" }));
    let seen = gateway.seen.lock().unwrap();
    assert_eq!(seen[0].contents, vec![Message::user("hello")]);
}

#[tokio::test]
async fn trailing_slash_route_is_served() {
    let (app, _) = app(Reply::Text("ok"));
    let (status, body) = post(app, "/chat/", json!({ "message": "hello" }).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "ok");
}

#[tokio::test]
async fn full_request_reaches_the_gateway() {
    let (app, gateway) = app(Reply::Text("r2"));
    let payload = json!({
        "model": "gemini",
        "message": "bye",
        "history": [
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": "r1" }
        ],
        "system_prompt": "You are Gemini, Google's AI model.",
        "temperature": 1.1,
        "max_tokens": 800
    });
    let (status, _) = post(app, "/chat/", payload.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let seen = gateway.seen.lock().unwrap();
    let request = &seen[0];
    assert_eq!(
        request.contents,
        vec![Message::user("hello"), Message::assistant("r1"), Message::user("bye")]
    );
    assert_eq!(request.system_prompt.as_deref(), Some("You are Gemini, Google's AI model."));
    assert_eq!(request.temperature, Some(1.1));
    assert_eq!(request.max_tokens, Some(800));
}

#[tokio::test]
async fn upstream_failure_is_a_bad_gateway_with_error_body() {
    let (app, _) = app(Reply::QuotaExceeded);
    let (status, body) = post(app, "/chat", json!({ "message": "hello" }).to_string()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("429"), "{error}");
    assert!(error.contains("RESOURCE_EXHAUSTED"), "{error}");
}

#[tokio::test]
async fn malformed_bodies_are_client_errors() {
    let cases = [
        "not json".to_string(),
        json!({}).to_string(),
        json!({ "message": 42 }).to_string(),
        json!({ "message": "hi", "history": [{ "role": "system", "content": "x" }] }).to_string(),
    ];

    for case in cases {
        let (app, gateway) = app(Reply::Text("unused"));
        let (status, body) = post(app, "/chat", case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert!(body["error"].is_string(), "{case}");
        assert!(gateway.seen.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn invalid_settings_are_client_errors() {
    let cases = [
        json!({ "message": "   " }),
        json!({ "message": "hi", "temperature": 2.5 }),
        json!({ "message": "hi", "temperature": -0.1 }),
        json!({ "message": "hi", "max_tokens": 50 }),
        json!({ "message": "hi", "max_tokens": 4001 }),
        json!({ "message": "hi", "model": "gpt4" }),
    ];

    for case in cases {
        let (app, _) = app(Reply::Text("unused"));
        let (status, body) = post(app, "/chat", case.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert!(body["error"].is_string(), "{case}");
    }
}

#[tokio::test]
async fn open_cors_answers_any_origin() {
    let (app, _) = app(Reply::Text("ok"));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header(header::ORIGIN, "http://localhost:8501")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn restricted_cors_ignores_other_origins() {
    let gateway = Arc::new(StubGateway {
        reply: Reply::Text("ok"),
        seen: Mutex::new(Vec::new()),
    });
    let policy = CorsPolicy::Origins(vec!["http://localhost:8501".to_string()]);
    let app = router(AppState::new(gateway), cors_layer(&policy));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header(header::ORIGIN, "http://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
