// src/tools/quote.rs — Stock quote lookup (Alpha Vantage global quote)

use std::sync::Arc;
use std::time::Duration;

use crate::infra::cache::ResponseCache;
use crate::util::group_thousands;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Absolute change above this share of price gets an emphasized trend note.
const SHARP_MOVE_RATIO: f64 = 0.05;

pub struct QuoteTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    cache: Arc<ResponseCache>,
}

impl QuoteTool {
    pub fn new(api_key: String, timeout: Duration, cache: Arc<ResponseCache>) -> Self {
        Self::with_base_url(api_key, timeout, cache, DEFAULT_BASE_URL.into())
    }

    pub fn with_base_url(
        api_key: String,
        timeout: Duration,
        cache: Arc<ResponseCache>,
        base_url: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            timeout,
            cache,
        }
    }

    /// Look up a quote and render it as conversational text. All failure
    /// modes resolve to a descriptive message.
    pub async fn invoke(&self, raw_symbol: &str) -> String {
        let symbol = raw_symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return "Please provide a ticker symbol to look up.".into();
        }

        let cache_key = format!("quote:{symbol}");
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(%symbol, "Quote cache hit");
            // Cached bodies already passed classification
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&cached) {
                if let Some(text) = render_quote(&symbol, &json["Global Quote"]) {
                    return text;
                }
            }
        }

        let body = match self.fetch(&symbol).await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                tracing::warn!(%symbol, "Quote provider timed out");
                return format!("The quote service took too long to respond for {symbol}. Please try again.");
            }
            Err(e) => {
                tracing::warn!(%symbol, "Quote provider request failed: {e}");
                return format!("I couldn't reach the quote service for {symbol}. Please try again later.");
            }
        };

        let json: serde_json::Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(%symbol, "Unparseable quote payload: {e}");
                return format!("Something went wrong while fetching the quote for {symbol}.");
            }
        };

        // Provider-signaled throttling arrives as a "Note" field on HTTP 200
        if json.get("Note").is_some() {
            return "The quote service is currently rate-limited. Please try again in a minute."
                .into();
        }
        if json.get("Error Message").is_some() {
            return format!("'{symbol}' doesn't look like a valid ticker symbol. Please check it and try again.");
        }

        match render_quote(&symbol, &json["Global Quote"]) {
            Some(text) => {
                self.cache.put(&cache_key, body);
                text
            }
            None => format!("No quote data is available for {symbol} right now."),
        }
    }

    async fn fetch(&self, symbol: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Format a global-quote payload, or `None` when the expected fields are
/// missing or empty.
fn render_quote(symbol: &str, quote: &serde_json::Value) -> Option<String> {
    let price: f64 = quote["05. price"].as_str()?.trim().parse().ok()?;
    let change: f64 = quote["09. change"].as_str()?.trim().parse().ok()?;
    let percent = quote["10. change percent"]
        .as_str()
        .unwrap_or("0")
        .trim()
        .trim_end_matches('%');
    let volume: u64 = quote["06. volume"]
        .as_str()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let trade_date = quote["07. latest trading day"].as_str().unwrap_or("n/a");

    let arrow = if change >= 0.0 { "📈" } else { "📉" };
    let signed_change = if change >= 0.0 {
        format!("+${:.2}", change)
    } else {
        format!("-${:.2}", change.abs())
    };
    let direction = if change >= 0.0 { "up" } else { "down" };
    let trend = if price > 0.0 && change.abs() > price * SHARP_MOVE_RATIO {
        format!("sharply {direction} on the day — an unusually large move")
    } else {
        format!("{direction} on the day")
    };

    Some(format!(
        "{arrow} {symbol}: ${price:.2} {signed_change} ({percent}%)\n\
         Volume: {} | Last trading day: {trade_date}\n\
         Trend: {trend}.",
        group_thousands(volume)
    ))
}
