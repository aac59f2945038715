// tests/chat_api_test.rs — Integration test: /chat pipeline over the router

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use tower::ServiceExt;

use finchat::agent::topic::TopicExtractor;
use finchat::api::{build_router, ApiState};
use finchat::infra::cache::ResponseCache;
use finchat::infra::config::SessionConfig;
use finchat::infra::errors::FinChatError;
use finchat::infra::rate_limit::RateLimiter;
use finchat::provider::*;
use finchat::session::SessionStore;
use finchat::tools::{NewsTool, QuoteTool, ToolRegistry};

/// A mock provider that always replies with the same text.
struct EchoProvider {
    reply: String,
}

#[async_trait]
impl ChatCompletion for EchoProvider {
    fn id(&self) -> &str {
        "echo"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, FinChatError> {
        Ok(ChatResponse {
            content: self.reply.clone(),
            tool_calls: vec![],
        })
    }
}

/// A provider that always fails, to drive the agent-error fallback path.
struct DownProvider;

#[async_trait]
impl ChatCompletion for DownProvider {
    fn id(&self) -> &str {
        "down"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, FinChatError> {
        Err(FinChatError::Provider {
            provider: "down".into(),
            message: "request timed out".into(),
        })
    }
}

fn test_state(provider: Arc<dyn ChatCompletion>, quota: usize) -> ApiState {
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(300)));
    let timeout = Duration::from_secs(1);
    let topics = TopicExtractor::new(provider.clone(), "test-model".into());
    let tools = Arc::new(ToolRegistry::new(
        QuoteTool::with_base_url(
            "key".into(),
            timeout,
            cache.clone(),
            "http://127.0.0.1:9".into(),
        ),
        NewsTool::with_base_url(
            "key".into(),
            timeout,
            cache.clone(),
            topics,
            "http://127.0.0.1:9".into(),
        ),
    ));
    ApiState {
        sessions: Arc::new(SessionStore::new(&SessionConfig::default())),
        limiter: Arc::new(RateLimiter::new(quota, Duration::from_secs(60))),
        cache,
        provider,
        tools,
        model: "test-model".into(),
    }
}

fn router_with_peer(state: ApiState, ip: [u8; 4]) -> Router {
    build_router(state, &["http://localhost:5500".to_string()])
        .layer(MockConnectInfo(SocketAddr::from((ip, 52000))))
}

fn test_router(state: ApiState) -> Router {
    router_with_peer(state, [127, 0, 0, 1])
}

fn chat_request(body: serde_json::Value, client: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chat_turn_success() {
    let provider = Arc::new(EchoProvider {
        reply: "Markets are calm today.".into(),
    });
    let state = test_state(provider, 30);
    let app = test_router(state.clone());

    let resp = app
        .oneshot(chat_request(
            serde_json::json!({"message": "How are markets?"}),
            "10.0.0.1",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["response"], "Markets are calm today.");
    assert!(body["session_id"].as_str().unwrap().len() > 0);
    assert!(body["response_time"].as_str().unwrap().ends_with('s'));
    assert!(body.get("error").is_none());
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn test_chat_reuses_provided_session() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let state = test_state(provider, 30);
    let app = test_router(state.clone());

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(chat_request(
                serde_json::json!({"message": "hi", "session_id": "alice-1"}),
                "10.0.0.1",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["session_id"], "alice-1");
    }
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn test_missing_message_is_400_and_creates_no_session() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let state = test_state(provider, 30);
    let app = test_router(state.clone());

    let resp = app
        .oneshot(chat_request(serde_json::json!({}), "10.0.0.1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().is_some());
    assert_eq!(state.sessions.len(), 0);
}

#[tokio::test]
async fn test_empty_message_is_400() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let app = test_router(test_state(provider, 30));

    let resp = app
        .oneshot(chat_request(
            serde_json::json!({"message": "   "}),
            "10.0.0.1",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_message_is_400() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let app = test_router(test_state(provider, 30));

    let resp = app
        .oneshot(chat_request(
            serde_json::json!({"message": "x".repeat(1001)}),
            "10.0.0.1",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_json_body_is_400() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let app = test_router(test_state(provider, 30));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header("content-type", "application/json")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_session_id_is_400() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let app = test_router(test_state(provider, 30));

    let resp = app
        .oneshot(chat_request(
            serde_json::json!({"message": "hi", "session_id": "!!!<>"}),
            "10.0.0.1",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_31st_request_is_rate_limited() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let app = test_router(test_state(provider, 30));

    for _ in 0..30 {
        let resp = app
            .clone()
            .oneshot(chat_request(
                serde_json::json!({"message": "hi"}),
                "10.0.0.9",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(chat_request(
            serde_json::json!({"message": "hi"}),
            "10.0.0.9",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(resp).await;
    assert_eq!(body["retry_after"], 60);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let app = test_router(test_state(provider, 1));

    let first = app
        .clone()
        .oneshot(chat_request(serde_json::json!({"message": "hi"}), "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let limited = app
        .clone()
        .oneshot(chat_request(serde_json::json!({"message": "hi"}), "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app
        .oneshot(chat_request(serde_json::json!({"message": "hi"}), "10.0.0.2"))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_direct_clients_get_separate_rate_buckets() {
    // No forwarding header: the limiter must key on the peer address,
    // so two direct connections never share a quota.
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let state = test_state(provider, 1);
    let app_a = router_with_peer(state.clone(), [10, 9, 0, 1]);
    let app_b = router_with_peer(state, [10, 9, 0, 2]);

    let direct = || {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"message": "hi"}).to_string(),
            ))
            .unwrap()
    };

    let first = app_a.clone().oneshot(direct()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let limited = app_a.oneshot(direct()).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app_b.oneshot(direct()).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_agent_failure_returns_fallback_with_marker() {
    let provider: Arc<dyn ChatCompletion> = Arc::new(DownProvider);
    let state = test_state(provider, 30);
    let app = test_router(state.clone());

    let resp = app
        .oneshot(chat_request(
            serde_json::json!({"message": "hi", "session_id": "bob"}),
            "10.0.0.1",
        ))
        .await
        .unwrap();

    // Deliberately HTTP 200 — the conversation should continue
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "agent_error");
    assert!(body["response"].as_str().unwrap().contains("trouble"));
    // The fallback turn is still recorded against the session
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn test_reply_markup_is_escaped() {
    let provider = Arc::new(EchoProvider {
        reply: "<b>AAPL</b> looks active".into(),
    });
    let app = test_router(test_state(provider, 30));

    let resp = app
        .oneshot(chat_request(serde_json::json!({"message": "hi"}), "10.0.0.1"))
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["response"], "&lt;b&gt;AAPL&lt;/b&gt; looks active");
}

#[tokio::test]
async fn test_health_reports_store_sizes() {
    let provider = Arc::new(EchoProvider { reply: "ok".into() });
    let state = test_state(provider, 30);
    state.cache.put("quote:AAPL", "{}".into());
    let app = test_router(state.clone());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_sessions"], 0);
    assert_eq!(body["cache_size"], 1);
}
