// src/tools/mod.rs — Closed set of data tools exposed to the agent
//
// Dispatch is by tool name through an explicit variant set, and adapters
// never fail outward: every failure branch renders user-presentable text,
// because the agent composes tool output directly into replies.

pub mod news;
pub mod quote;

use crate::provider::{ToolCall, ToolDef};

pub use news::NewsTool;
pub use quote::QuoteTool;

/// The two capabilities the agent can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    StockQuote,
    MarketNews,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "get_stock_quote" => Some(Self::StockQuote),
            "get_market_news" => Some(Self::MarketNews),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::StockQuote => "get_stock_quote",
            Self::MarketNews => "get_market_news",
        }
    }
}

pub struct ToolRegistry {
    quote: QuoteTool,
    news: NewsTool,
}

impl ToolRegistry {
    pub fn new(quote: QuoteTool, news: NewsTool) -> Self {
        Self { quote, news }
    }

    /// Tool schemas advertised to the model on every agent round.
    pub fn definitions() -> Vec<ToolDef> {
        vec![
            ToolDef {
                name: ToolKind::StockQuote.name().into(),
                description: "Get the current quote for a specific stock: price, daily \
                    change, volume, and trend. Use only when the user asks about a \
                    specific security."
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "symbol": {
                            "type": "string",
                            "description": "Ticker symbol, e.g. AAPL or MSFT"
                        }
                    },
                    "required": ["symbol"]
                }),
            },
            ToolDef {
                name: ToolKind::MarketNews.name().into(),
                description: "Get recent financial news headlines with an aggregate \
                    sentiment read. Use for questions about market mood, headlines, \
                    or what is happening around a company or theme."
                    .into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What the user wants news about, in their own words"
                        }
                    },
                    "required": ["query"]
                }),
            },
        ]
    }

    /// Dispatch one tool call. Unknown names and missing arguments come
    /// back as error notices for the model, never as failures.
    pub async fn dispatch(&self, tc: &ToolCall) -> String {
        let Some(kind) = ToolKind::from_name(&tc.name) else {
            tracing::warn!(tool = %tc.name, "Model requested unknown tool");
            return format!(
                "Error: Tool '{}' is not recognized. Available tools: get_stock_quote, get_market_news.",
                tc.name
            );
        };

        match kind {
            ToolKind::StockQuote => {
                let Some(symbol) = tc.arguments.get("symbol").and_then(|v| v.as_str()) else {
                    return "Error: get_stock_quote requires a 'symbol' argument.".into();
                };
                self.quote.invoke(symbol).await
            }
            ToolKind::MarketNews => {
                let Some(query) = tc.arguments.get("query").and_then(|v| v.as_str()) else {
                    return "Error: get_market_news requires a 'query' argument.".into();
                };
                self.news.invoke(query).await
            }
        }
    }
}
