mod config;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod sanitize;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::lineup::LineupCache;
use crate::pipeline::rate_limit::RateLimiterStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::json_file::JsonFileQuoteStore;
use crate::store::postgres::PgQuoteStore;
use crate::store::QuoteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dugout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the quote store
    let store: Arc<dyn QuoteStore> = match &config.database_url {
        Some(url) => Arc::new(PgQuoteStore::connect(url).await?),
        None => {
            info!("DATABASE_URL not set, using JSON file store in {}", config.data_dir);
            Arc::new(JsonFileQuoteStore::new(config.data_dir.clone()))
        }
    };

    // Initialize the completion client
    let llm = LlmClient::new(config.openai_api_key.clone());
    info!("Completion client initialized (model: {})", llm_client::MODEL);

    // Build app state
    let state = AppState {
        store,
        llm,
        config: config.clone(),
        rate_limiter: Arc::new(RateLimiterStore::new()),
        lineup_cache: Arc::new(LineupCache::new()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
