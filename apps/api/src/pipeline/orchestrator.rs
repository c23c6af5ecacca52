//! Generation orchestration — composes the rate gates, example selection,
//! the model call, output post-processing and persistence.
//!
//! Flow: sanitize input → client gate → global gate → load snapshot →
//!       build prompt → completion call → output pipeline → append to store.
//!
//! Every failure is terminal and classified; retry policy belongs to callers.

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{AppError, RateLimitScope};
use crate::llm_client::SamplingConfig;
use crate::models::quote::{NewQuote, SLOT_LABELS};
use crate::pipeline::{lineup, output, prompts, selector};
use crate::sanitize::{sanitize_input, validate_input};
use crate::state::AppState;

/// Shared key for the global generation gate.
const GLOBAL_GATE_KEY: &str = "generate:global";

/// A successfully generated and persisted quote.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub id: i64,
    pub original: String,
    pub interpreted: Option<String>,
    pub official: String,
}

/// Runs the full generation pipeline for one submission.
pub async fn generate(
    state: &AppState,
    input: &str,
    client_key: &str,
) -> Result<GenerationOutcome, AppError> {
    validate_input(input, state.config.input_max_chars).map_err(AppError::Validation)?;
    let sanitized = sanitize_input(input.trim());

    check_rate_gates(state, client_key)?;

    let quotes = state.store.load_all().await?;
    let examples = selector::format_examples(&quotes, state.config.example_count);
    let examples = if examples.is_empty() {
        prompts::DEFAULT_EXAMPLE.to_string()
    } else {
        examples
    };
    info!("Prompting with examples from {} stored quotes", quotes.len());

    let system = prompts::build_system_prompt(&examples);
    let user = prompts::build_user_message(&sanitized);
    let raw = state
        .llm
        .complete(&system, &user, &SamplingConfig::default())
        .await?;

    let fields = output::process(&raw, &state.config.output_limits())?;

    let id = state
        .store
        .append(NewQuote {
            original: sanitized.clone(),
            interpreted: fields.interpreted.clone(),
            official: fields.official.clone(),
            slot_label: None,
        })
        .await?;

    info!(
        "Stored quote {id}: interpreted {} chars, official {} chars",
        fields.interpreted.as_ref().map_or(0, |s| s.chars().count()),
        fields.official.chars().count()
    );

    Ok(GenerationOutcome {
        id,
        original: sanitized,
        interpreted: fields.interpreted,
        official: fields.official,
    })
}

/// Both gates must pass: the caller's own window, then the shared one.
fn check_rate_gates(state: &AppState, client_key: &str) -> Result<(), AppError> {
    let window = Duration::seconds(state.config.rate_window_secs);
    let now = Utc::now();

    let client = state.rate_limiter.check(
        &format!("generate:{client_key}"),
        state.config.client_hourly_cap,
        window,
    );
    if !client.allowed {
        warn!("Client {client_key} rate limited");
        return Err(AppError::RateLimited {
            scope: RateLimitScope::Client,
            retry_after_secs: client.retry_after_secs(now),
        });
    }

    let global = state
        .rate_limiter
        .check(GLOBAL_GATE_KEY, state.config.global_hourly_cap, window);
    if !global.allowed {
        warn!("Global generation gate saturated");
        return Err(AppError::RateLimited {
            scope: RateLimitScope::Global,
            retry_after_secs: global.retry_after_secs(now),
        });
    }

    Ok(())
}

/// Returns the lineup for `date_key`, composing and caching it on first use.
/// Recomputation for the same key and an unchanged snapshot is idempotent,
/// so a cache miss after restart is invisible to callers.
pub async fn daily_lineup(state: &AppState, date_key: &str) -> Result<Vec<i64>, AppError> {
    if let Some(ids) = state.lineup_cache.get(date_key) {
        return Ok(ids);
    }

    let quotes = state.store.load_all().await?;
    let ids = lineup::compose(&quotes, date_key, &SLOT_LABELS);
    info!("Composed lineup for {date_key}: {} slots filled", ids.len());

    state.lineup_cache.put(date_key, ids.clone());
    Ok(ids)
}
