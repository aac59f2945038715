// src/infra/errors.rs — Error types for finchat

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinChatError {
    // Bad or missing client input (HTTP 400)
    #[error("Invalid request: {0}")]
    Validation(String),

    // Admission control rejection (HTTP 429)
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // External backend errors
    #[error("Provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    // LLM orchestration failure — the caller substitutes a fallback reply
    #[error("Agent failure: {0}")]
    Agent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
