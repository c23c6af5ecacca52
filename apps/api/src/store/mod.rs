//! Quote persistence — a trait seam with two backends.
//!
//! `AppState` holds an `Arc<dyn QuoteStore>`, chosen at startup: Postgres
//! when `DATABASE_URL` is set, otherwise a JSON file under `DATA_DIR`.
//! `load_all` snapshots may be stale relative to concurrent writes; callers
//! tolerate this because the lineup is cached per day regardless.

pub mod json_file;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::quote::{NewQuote, Quote};

/// Curated seed quotes occupy ids below this; store-assigned ids start here.
pub const FIRST_USER_QUOTE_ID: i64 = 1001;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("quote {0} not found")]
    NotFound(i64),
}

/// The three engagement counters a quote accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementCounter {
    Likes,
    Reposts,
    QuotedReposts,
}

impl EngagementCounter {
    /// Column / field name in both backends.
    pub fn column(&self) -> &'static str {
        match self {
            EngagementCounter::Likes => "likes",
            EngagementCounter::Reposts => "reposts",
            EngagementCounter::QuotedReposts => "quoted_reposts",
        }
    }
}

/// Storage seam for quotes.
///
/// `load_all` returns quotes in ascending id order, which places curated
/// seed data ahead of user submissions — the example selector's tie-break
/// depends on that ordering.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Quote>, StoreError>;

    /// Persists a quote and returns its assigned id.
    async fn append(&self, quote: NewQuote) -> Result<i64, StoreError>;

    /// Applies `delta` to one engagement counter, clamped at zero,
    /// and returns the new count.
    async fn adjust_count(
        &self,
        id: i64,
        counter: EngagementCounter,
        delta: i64,
    ) -> Result<i64, StoreError>;
}
