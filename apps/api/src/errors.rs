use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::UpstreamError;
use crate::pipeline::output::OutputRejection;
use crate::store::StoreError;

/// Which rate-limit gate rejected the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    Client,
    Global,
}

impl std::fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitScope::Client => write!(f, "client"),
            RateLimitScope::Global => write!(f, "global"),
        }
    }
}

/// Application-level error type. Every failure in the pipeline is terminal
/// and classified into one of these variants; no internal retries anywhere.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited ({scope}): retry after {retry_after_secs}s")]
    RateLimited {
        scope: RateLimitScope,
        retry_after_secs: i64,
    },

    #[error("Upstream model error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Generation invalid: {0}")]
    GenerationInvalid(#[from] OutputRejection),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::RateLimited {
                scope,
                retry_after_secs,
            } => {
                // The global gate signals saturation, not caller misbehavior
                let status = match scope {
                    RateLimitScope::Client => StatusCode::TOO_MANY_REQUESTS,
                    RateLimitScope::Global => StatusCode::SERVICE_UNAVAILABLE,
                };
                let minutes = (retry_after_secs + 59) / 60;
                let body = Json(json!({
                    "error": {
                        "code": "RATE_LIMITED",
                        "message": format!("Rate limit reached. Retry in {minutes} minute(s)."),
                        "retryAfter": retry_after_secs,
                    }
                }));
                return (status, [(RETRY_AFTER, retry_after_secs.to_string())], body)
                    .into_response();
            }
            AppError::Upstream(e) => {
                tracing::error!("Upstream model error: {e}");
                let (status, code) = match e {
                    UpstreamError::Auth(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_AUTH"),
                    UpstreamError::Quota(_) => (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_QUOTA"),
                    UpstreamError::MalformedRequest(_) => {
                        (StatusCode::BAD_GATEWAY, "UPSTREAM_REQUEST")
                    }
                    UpstreamError::Transient(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
                    }
                };
                (status, code, "The text generation service failed".to_string())
            }
            AppError::GenerationInvalid(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "GENERATION_INVALID",
                e.to_string(),
            ),
            AppError::Store(StoreError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Quote {id} not found"),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
