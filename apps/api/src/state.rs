use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::lineup::LineupCache;
use crate::pipeline::rate_limit::RateLimiterStore;
use crate::store::QuoteStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable quote store. Postgres when DATABASE_URL is set, JSON file otherwise.
    pub store: Arc<dyn QuoteStore>,
    pub llm: LlmClient,
    pub config: Config,
    /// Process-wide request windows; shared across handlers, never persisted.
    pub rate_limiter: Arc<RateLimiterStore>,
    /// The current day's composed lineup, keyed by the UTC+9 date string.
    pub lineup_cache: Arc<LineupCache>,
}
