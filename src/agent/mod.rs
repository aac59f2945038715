// src/agent/mod.rs — Per-turn conversational orchestration
//
// One turn runs Idle → Planning → (ToolCall)* → Responding: the model is
// called with the tool schemas, any tool invocations it emits are
// dispatched and fed back as tool results, and the loop ends when the
// model answers in plain text. The round count is bounded.

pub mod topic;

use std::sync::Arc;

use crate::infra::errors::FinChatError;
use crate::provider::{ChatCompletion, ChatRequest, Message};
use crate::tools::ToolRegistry;

/// Maximum number of tool-call round-trips per turn.
const MAX_TOOL_ROUNDS: usize = 4;

/// Reply substituted by the HTTP layer when a turn fails outright.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble processing your request right now. Please try again in a moment.";

const SYSTEM_PROMPT: &str = "You are FinBot, a helpful financial assistant.\n\
\n\
Tool rules:\n\
- Use get_stock_quote only when the user asks about a specific security or ticker.\n\
- Use get_market_news for questions about market mood, sentiment, or headlines.\n\
- Never invent price predictions or give investment advice.\n\
- When provider data is unavailable, say so plainly instead of guessing.\n\
\n\
Keep replies concise and conversational, and include the tool output's key \
figures when you used a tool.";

/// A conversational agent bound to one session. Holds no per-turn state;
/// history is supplied by the caller on every turn.
pub struct Agent {
    provider: Arc<dyn ChatCompletion>,
    model: String,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    pub fn new(provider: Arc<dyn ChatCompletion>, model: String, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model,
            tools,
        }
    }

    /// Run one turn: prior history plus the new user text in, final reply
    /// text out. Tool failures are absorbed by the adapters; only an LLM
    /// call failure (or a turn that never reaches a text reply) errors.
    pub async fn run_turn(
        &self,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, FinChatError> {
        let mut messages: Vec<Message> = history.to_vec();
        messages.push(Message::user(user_text));

        for round in 0..MAX_TOOL_ROUNDS {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                tools: ToolRegistry::definitions(),
                max_tokens: Some(1024),
                temperature: Some(0.7),
                system: Some(SYSTEM_PROMPT.into()),
            };

            let response = self
                .provider
                .chat(request)
                .await
                .map_err(|e| {
                    FinChatError::Agent(format!("{} completion failed: {e}", self.provider.id()))
                })?;

            if response.tool_calls.is_empty() {
                let reply = response.content.trim().to_string();
                if reply.is_empty() {
                    return Err(FinChatError::Agent("model returned an empty reply".into()));
                }
                return Ok(reply);
            }

            tracing::debug!(
                round,
                calls = response.tool_calls.len(),
                "Dispatching tool calls"
            );
            messages.push(Message::assistant_with_tool_calls(
                &response.content,
                response.tool_calls.clone(),
            ));
            for tc in &response.tool_calls {
                let result = self.tools.dispatch(tc).await;
                messages.push(Message::tool_result(&tc.id, result));
            }
        }

        Err(FinChatError::Agent(format!(
            "no final reply after {MAX_TOOL_ROUNDS} tool rounds"
        )))
    }
}
