// src/agent/topic.rs — LLM-backed topic extraction for the news tool

use std::sync::Arc;

use crate::provider::{ChatCompletion, ChatRequest, Message};

/// Topic used whenever extraction fails for any reason.
pub const FALLBACK_TOPIC: &str = "market";

const EXTRACTION_PROMPT: &str = "You extract search keywords. Reply with a 1-3 word \
financial search keyword for the user's question — the company, asset, or market \
theme it is about. Reply with the keyword only, no punctuation or explanation.";

/// Reduces a free-text user message to a short news-search keyword via a
/// single-turn completion call. Must never fail: every error path resolves
/// to [`FALLBACK_TOPIC`].
pub struct TopicExtractor {
    provider: Arc<dyn ChatCompletion>,
    model: String,
}

impl TopicExtractor {
    pub fn new(provider: Arc<dyn ChatCompletion>, model: String) -> Self {
        Self { provider, model }
    }

    pub async fn extract(&self, message: &str) -> String {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(message)],
            tools: Vec::new(),
            max_tokens: Some(16),
            temperature: Some(0.0),
            system: Some(EXTRACTION_PROMPT.into()),
        };

        let reply = match self.provider.chat(request).await {
            Ok(resp) => resp.content,
            Err(e) => {
                tracing::warn!("Topic extraction failed, using fallback: {e}");
                return FALLBACK_TOPIC.to_string();
            }
        };

        let topic = reply
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '`' || c == '.')
            .trim()
            .to_string();

        // Guard against the model ignoring the instruction
        if topic.is_empty() || topic.split_whitespace().count() > 3 || topic.len() > 50 {
            tracing::warn!(reply = %reply, "Unusable extracted topic, using fallback");
            return FALLBACK_TOPIC.to_string();
        }
        topic
    }
}
