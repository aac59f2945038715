// src/main.rs — finchat entry point

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use finchat::agent::topic::TopicExtractor;
use finchat::api::{self, ApiState};
use finchat::infra::cache::ResponseCache;
use finchat::infra::config::Config;
use finchat::infra::logger;
use finchat::infra::rate_limit::RateLimiter;
use finchat::provider::openai::OpenAIClient;
use finchat::provider::ChatCompletion;
use finchat::session::SessionStore;
use finchat::tools::{NewsTool, QuoteTool, ToolRegistry};

#[derive(Parser)]
#[command(name = "finchat", version, about = "Conversational financial assistant backend")]
struct Cli {
    /// Path to a TOML config file (defaults to ./finchat.toml when present)
    #[arg(long)]
    config: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Respects RUST_LOG
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let openai_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let quote_key = env_key("ALPHA_VANTAGE_API_KEY");
    let news_key = env_key("NEWS_API_KEY");

    let llm_timeout = Duration::from_secs(config.llm.timeout_seconds);
    let provider: Arc<dyn ChatCompletion> = Arc::new(match config.llm.base_url.clone() {
        Some(base) => OpenAIClient::with_base_url(openai_key, llm_timeout, base),
        None => OpenAIClient::new(openai_key, llm_timeout),
    });

    let cache = Arc::new(ResponseCache::new(Duration::from_secs(
        config.cache.ttl_seconds,
    )));

    let tool_timeout = Duration::from_secs(config.tools.timeout_seconds);
    let quote = match config.tools.quote_base_url.clone() {
        Some(base) => QuoteTool::with_base_url(quote_key, tool_timeout, cache.clone(), base),
        None => QuoteTool::new(quote_key, tool_timeout, cache.clone()),
    };
    let topics = TopicExtractor::new(provider.clone(), config.llm.model.clone());
    let news = match config.tools.news_base_url.clone() {
        Some(base) => NewsTool::with_base_url(news_key, tool_timeout, cache.clone(), topics, base),
        None => NewsTool::new(news_key, tool_timeout, cache.clone(), topics),
    };

    let state = ApiState {
        sessions: Arc::new(SessionStore::new(&config.session)),
        limiter: Arc::new(RateLimiter::new(
            config.limits.quota,
            Duration::from_secs(config.limits.window_seconds),
        )),
        cache,
        provider,
        tools: Arc::new(ToolRegistry::new(quote, news)),
        model: config.llm.model.clone(),
    };

    api::start_server(&config.server, state).await
}

/// Missing data-provider keys are survivable: the affected tool reports
/// the backend as unavailable instead of blocking startup.
fn env_key(name: &str) -> String {
    match std::env::var(name) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!("{name} is not set; the dependent tool will report errors");
            String::new()
        }
    }
}
