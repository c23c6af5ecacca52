//! Axum route handlers for the quote API.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::quote::Quote;
use crate::pipeline::lineup::current_date_key;
use crate::pipeline::orchestrator::{self, GenerationOutcome};
use crate::state::AppState;
use crate::store::EngagementCounter;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct QuotesResponse {
    pub quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
pub struct EngageRequest {
    /// "like" or "unlike"; repost actions mirror the pair.
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct EngageResponse {
    pub id: i64,
    pub likes: i64,
}

/// One filled lineup slot, with the ready-to-post share text alongside the
/// quote so the repost button needs no client-side formatting.
#[derive(Debug, Serialize)]
pub struct LineupSlot {
    pub quote: Quote,
    pub share_text: String,
}

#[derive(Debug, Serialize)]
pub struct LineupResponse {
    pub date: String,
    pub quote_ids: Vec<i64>,
    pub slots: Vec<LineupSlot>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/quotes/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerationOutcome>, AppError> {
    let client_key = client_key_from_headers(&headers);
    let outcome = orchestrator::generate(&state, &request.input, &client_key).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/quotes
pub async fn handle_list_quotes(
    State(state): State<AppState>,
) -> Result<Json<QuotesResponse>, AppError> {
    let quotes = state.store.load_all().await?;
    Ok(Json(QuotesResponse { quotes }))
}

/// POST /api/v1/quotes/:id/like
pub async fn handle_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<EngageRequest>,
) -> Result<Json<EngageResponse>, AppError> {
    let delta = match request.action.as_str() {
        "like" => 1,
        "unlike" => -1,
        other => {
            return Err(AppError::Validation(format!(
                "unknown action '{other}', expected like or unlike"
            )))
        }
    };

    let likes = state
        .store
        .adjust_count(id, EngagementCounter::Likes, delta)
        .await?;
    Ok(Json(EngageResponse { id, likes }))
}

/// GET /api/v1/lineup
///
/// Today's lineup in display order, resolved to full quotes for rendering.
pub async fn handle_lineup(State(state): State<AppState>) -> Result<Json<LineupResponse>, AppError> {
    let date = current_date_key();
    let quote_ids = orchestrator::daily_lineup(&state, &date).await?;

    let all = state.store.load_all().await?;
    let slots = quote_ids
        .iter()
        .filter_map(|id| all.iter().find(|q| q.id == *id).cloned())
        .map(|quote| LineupSlot {
            share_text: quote.share_text(),
            quote,
        })
        .collect();

    Ok(Json(LineupResponse {
        date,
        quote_ids,
        slots,
    }))
}

/// Client key for the per-client rate gate, from proxy headers.
fn client_key_from_headers(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_key_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_key_from_headers(&headers), "10.0.0.1");
    }

    #[test]
    fn test_client_key_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_key_from_headers(&headers), "10.0.0.9");
    }

    #[test]
    fn test_client_key_defaults_to_unknown() {
        assert_eq!(client_key_from_headers(&HeaderMap::new()), "unknown");
    }
}
