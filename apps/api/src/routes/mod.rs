pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/quotes/generate", post(handlers::handle_generate))
        .route("/api/v1/quotes", get(handlers::handle_list_quotes))
        .route("/api/v1/quotes/:id/like", post(handlers::handle_like))
        .route("/api/v1/lineup", get(handlers::handle_lineup))
        .with_state(state)
}
