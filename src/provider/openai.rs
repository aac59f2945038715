// src/provider/openai.rs — OpenAI Chat API client

use async_trait::async_trait;
use std::time::Duration;

use super::{ChatCompletion, ChatRequest, ChatResponse, Role, ToolCall};
use crate::infra::errors::FinChatError;

pub struct OpenAIClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAIClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".into(),
            timeout,
        }
    }

    pub fn with_base_url(api_key: String, timeout: Duration, base_url: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }

        for m in &request.messages {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            let mut msg = serde_json::json!({
                "role": role,
                "content": m.content,
            });
            if !m.tool_calls.is_empty() {
                let calls: Vec<serde_json::Value> = m
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        serde_json::json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                msg["tool_calls"] = serde_json::json!(calls);
            }
            if let Some(tc_id) = &m.tool_call_id {
                msg["tool_call_id"] = serde_json::json!(tc_id);
            }
            messages.push(msg);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = serde_json::json!(tools);
        }

        body
    }
}

#[async_trait]
impl ChatCompletion for OpenAIClient {
    fn id(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, FinChatError> {
        let body = self.build_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| FinChatError::Provider {
                provider: "openai".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FinChatError::Provider {
                provider: "openai".into(),
                message: "quota exceeded (HTTP 429)".into(),
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(FinChatError::Provider {
                provider: "openai".into(),
                message: format!("HTTP {}: {}", status, error_body),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| FinChatError::Provider {
                provider: "openai".into(),
                message: format!("Failed to parse response: {}", e),
            })?;

        let choice = &resp["choices"][0];
        let content = choice["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let tool_calls = choice["message"]["tool_calls"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .map(|tc| ToolCall {
                id: tc["id"].as_str().unwrap_or("").to_string(),
                name: tc["function"]["name"].as_str().unwrap_or("").to_string(),
                arguments: serde_json::from_str(
                    tc["function"]["arguments"].as_str().unwrap_or("{}"),
                )
                .unwrap_or_default(),
            })
            .collect();

        Ok(ChatResponse {
            content,
            tool_calls,
        })
    }
}
