// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::FinChatError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

// Every field carries its own serde default so a section can be given
// partially; the Default impls reuse the same helpers.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by the CORS layer (the chat frontend).
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8000
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:5500".into(),
        "http://127.0.0.1:5500".into(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Override for OpenAI-compatible gateways; defaults to api.openai.com.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            timeout_seconds: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_quota")]
    pub quota: usize,
    #[serde(default = "default_window")]
    pub window_seconds: u64,
}

fn default_quota() -> usize {
    30
}

fn default_window() -> u64 {
    60
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            window_seconds: default_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

fn default_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: i64,
    /// Store size above which a cleanup pass runs on the next lookup.
    #[serde(default = "default_cleanup_threshold")]
    pub cleanup_threshold: usize,
}

fn default_max_history() -> usize {
    20
}

fn default_idle_timeout() -> i64 {
    3600
}

fn default_cleanup_threshold() -> usize {
    100
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            idle_timeout_seconds: default_idle_timeout(),
            cleanup_threshold: default_cleanup_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub quote_base_url: Option<String>,
    #[serde(default)]
    pub news_base_url: Option<String>,
    #[serde(default = "default_tool_timeout")]
    pub timeout_seconds: u64,
}

fn default_tool_timeout() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            quote_base_url: None,
            news_base_url: None,
            timeout_seconds: default_tool_timeout(),
        }
    }
}

impl Config {
    /// Load from the given path; missing file falls back to defaults.
    pub fn load_from(path: &Path) -> Result<Self, FinChatError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| FinChatError::Config(e.to_string()))
    }

    pub fn load() -> Result<Self, FinChatError> {
        Self::load_from(Path::new("finchat.toml"))
    }
}
