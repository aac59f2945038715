// src/api/types.rs

use serde::{Deserialize, Serialize};

/// Request body for a chat turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Successful chat turn. `error` is set to `"agent_error"` when the reply
/// is the fallback text — still HTTP 200, the conversation continues.
#[derive(Debug, Serialize)]
pub struct ChatTurnResponse {
    pub response: String,
    pub session_id: String,
    pub response_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
    pub cache_size: usize,
}
