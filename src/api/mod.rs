// src/api/mod.rs — HTTP boundary for the chat pipeline

pub mod handlers;
pub mod types;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::infra::cache::ResponseCache;
use crate::infra::config::ServerConfig;
use crate::infra::rate_limit::RateLimiter;
use crate::provider::ChatCompletion;
use crate::session::SessionStore;
use crate::tools::ToolRegistry;

/// Shared state for API handlers. The three keyed stores are the only
/// process-wide mutable state; everything else is immutable wiring.
#[derive(Clone)]
pub struct ApiState {
    pub sessions: Arc<SessionStore>,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<ResponseCache>,
    pub provider: Arc<dyn ChatCompletion>,
    pub tools: Arc<ToolRegistry>,
    pub model: String,
}

/// Build the axum router with all routes.
pub fn build_router(state: ApiState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// Start the API server (blocking).
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let router = build_router(state, &config.allowed_origins);

    tracing::info!("finchat listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    // Peer addresses feed the rate limiter when no forwarding header is set
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
