//! Postgres-backed quote store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::quote::{NewQuote, Quote};
use crate::store::{EngagementCounter, QuoteStore, StoreError, FIRST_USER_QUOTE_ID};

pub struct PgQuoteStore {
    pool: PgPool,
}

impl PgQuoteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    async fn load_all(&self) -> Result<Vec<Quote>, StoreError> {
        let quotes = sqlx::query_as::<_, Quote>(
            r#"
            SELECT id, original, interpreted, official,
                   likes, reposts, quoted_reposts, slot_label, created_at
            FROM quotes
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(quotes)
    }

    async fn append(&self, quote: NewQuote) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO quotes (id, original, interpreted, official,
                                likes, reposts, quoted_reposts, slot_label, created_at)
            VALUES (
                GREATEST(COALESCE((SELECT MAX(id) FROM quotes), 0) + 1, $5),
                $1, $2, $3, 0, 0, 0, $4, NOW()
            )
            RETURNING id
            "#,
        )
        .bind(&quote.original)
        .bind(&quote.interpreted)
        .bind(&quote.official)
        .bind(&quote.slot_label)
        .bind(FIRST_USER_QUOTE_ID)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("id"))
    }

    async fn adjust_count(
        &self,
        id: i64,
        counter: EngagementCounter,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let column = counter.column();
        let query = format!(
            "UPDATE quotes SET {column} = GREATEST({column} + $2, 0) \
             WHERE id = $1 RETURNING {column}"
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        Ok(row.get::<i64, _>(column))
    }
}
