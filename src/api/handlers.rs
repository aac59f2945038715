// src/api/handlers.rs

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::agent::{Agent, FALLBACK_REPLY};
use crate::api::{types::*, ApiState};
use crate::infra::errors::FinChatError;
use crate::provider::Message;
use crate::sanitize::{self, MAX_MESSAGE_CHARS};

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Map pipeline errors to their HTTP shape. Anything outside the
/// anticipated taxonomy becomes a generic 500; detail stays in the
/// server log.
fn error_response(err: FinChatError) -> ApiError {
    match err {
        FinChatError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        ),
        FinChatError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "Too many requests. Please slow down.",
                "retry_after": retry_after_secs,
            })),
        ),
        other => {
            tracing::error!("Unhandled error in request pipeline: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
        }
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    error_response(FinChatError::Validation(message.into()))
}

/// POST /chat — One conversational turn.
///
/// Pipeline: admission → validation/sanitization → session lookup →
/// agent turn → history append → formatted reply.
pub async fn chat(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<ChatTurnRequest>, JsonRejection>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let started = Instant::now();

    let client = client_key(&headers, peer);
    if !state.limiter.try_admit(&client) {
        return Err(error_response(FinChatError::RateLimited {
            retry_after_secs: state.limiter.retry_after_secs(),
        }));
    }

    let Json(body) = body.map_err(|e| bad_request(format!("Invalid request body: {e}")))?;

    if body.message.trim().is_empty() {
        return Err(bad_request("Message cannot be empty"));
    }
    if body.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(bad_request(format!(
            "Message too long (max {MAX_MESSAGE_CHARS} characters)"
        )));
    }
    let message = sanitize::sanitize_message(&body.message);

    let session_key = match body.session_id.as_deref() {
        Some(id) => {
            let key = sanitize::sanitize_session_key(id);
            if key.is_empty() {
                return Err(bad_request("Invalid session_id"));
            }
            key
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    let (agent, history) = state.sessions.get_or_create(&session_key, || {
        Agent::new(
            state.provider.clone(),
            state.model.clone(),
            state.tools.clone(),
        )
    });

    let (reply, error_marker) = match agent.run_turn(&history, &message).await {
        Ok(text) => (sanitize::escape_html(&text), None),
        Err(e @ (FinChatError::Agent(_) | FinChatError::Provider { .. })) => {
            tracing::error!(session = %session_key, "Agent turn failed: {e}");
            (FALLBACK_REPLY.to_string(), Some("agent_error".to_string()))
        }
        Err(e) => {
            tracing::error!(session = %session_key, "Unexpected turn failure: {e}");
            return Err(error_response(e));
        }
    };

    state
        .sessions
        .append_turn(&session_key, Message::user(&message), Message::assistant(&reply));

    Ok(Json(ChatTurnResponse {
        response: reply,
        session_id: session_key,
        response_time: format!("{:.2}s", started.elapsed().as_secs_f64()),
        error: error_marker,
    }))
}

/// GET /health — Process status plus store sizes.
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        active_sessions: state.sessions.len(),
        cache_size: state.cache.len(),
    })
}

/// Rate-limit key for the requester: first `X-Forwarded-For` entry when
/// present (the dev frontend sits behind a proxy), else the peer address.
fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}
