//! JSON-file quote store — the zero-infrastructure deployment backend.
//!
//! One file holds every quote; a mutex serializes read-modify-write cycles
//! within the process. Curated seed data can be shipped in the same file
//! with ids below [`FIRST_USER_QUOTE_ID`].

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::models::quote::{NewQuote, Quote};
use crate::store::{EngagementCounter, QuoteStore, StoreError, FIRST_USER_QUOTE_ID};

#[derive(Debug, Default, Serialize, Deserialize)]
struct QuotesFile {
    #[serde(default)]
    quotes: Vec<Quote>,
}

pub struct JsonFileQuoteStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileQuoteStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("quotes.json"),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_file(&self) -> Result<QuotesFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Quotes file not found at {:?}, starting empty", self.path);
                Ok(QuotesFile::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, file: &QuotesFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(file)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for JsonFileQuoteStore {
    async fn load_all(&self) -> Result<Vec<Quote>, StoreError> {
        let mut file = self.read_file().await?;
        file.quotes.sort_by_key(|q| q.id);
        Ok(file.quotes)
    }

    async fn append(&self, quote: NewQuote) -> Result<i64, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.read_file().await?;
        let next_id = file
            .quotes
            .iter()
            .map(|q| q.id)
            .max()
            .map_or(FIRST_USER_QUOTE_ID, |max| {
                (max + 1).max(FIRST_USER_QUOTE_ID)
            });

        file.quotes.push(Quote {
            id: next_id,
            original: quote.original,
            interpreted: quote.interpreted,
            official: quote.official,
            likes: 0,
            reposts: 0,
            quoted_reposts: 0,
            slot_label: quote.slot_label,
            created_at: Utc::now(),
        });

        self.write_file(&file).await?;
        Ok(next_id)
    }

    async fn adjust_count(
        &self,
        id: i64,
        counter: EngagementCounter,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.read_file().await?;
        let quote = file
            .quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let slot = match counter {
            EngagementCounter::Likes => &mut quote.likes,
            EngagementCounter::Reposts => &mut quote.reposts,
            EngagementCounter::QuotedReposts => &mut quote.quoted_reposts,
        };
        *slot = (*slot + delta).max(0);
        let new_count = *slot;

        self.write_file(&file).await?;
        Ok(new_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_quote(official: &str) -> NewQuote {
        NewQuote {
            original: "small words".to_string(),
            interpreted: Some("This is how legends are actually made".to_string()),
            official: official.to_string(),
            slot_label: None,
        }
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_ids_from_1001() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQuoteStore::new(dir.path());

        let first = store.append(new_quote("one")).await.unwrap();
        let second = store.append(new_quote("two")).await.unwrap();

        assert_eq!(first, FIRST_USER_QUOTE_ID);
        assert_eq!(second, FIRST_USER_QUOTE_ID + 1);
    }

    #[tokio::test]
    async fn test_load_all_returns_ascending_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQuoteStore::new(dir.path());

        store.append(new_quote("one")).await.unwrap();
        store.append(new_quote("two")).await.unwrap();

        let quotes = store.load_all().await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes[0].id < quotes[1].id);
        assert_eq!(quotes[0].official, "one");
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQuoteStore::new(dir.path());

        let quotes = store.load_all().await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn test_adjust_count_clamps_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQuoteStore::new(dir.path());
        let id = store.append(new_quote("one")).await.unwrap();

        let up = store
            .adjust_count(id, EngagementCounter::Likes, 1)
            .await
            .unwrap();
        assert_eq!(up, 1);

        let down = store
            .adjust_count(id, EngagementCounter::Likes, -5)
            .await
            .unwrap();
        assert_eq!(down, 0, "counters never go negative");
    }

    #[tokio::test]
    async fn test_adjust_count_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQuoteStore::new(dir.path());

        let result = store.adjust_count(42, EngagementCounter::Reposts, 1).await;
        assert!(matches!(result, Err(StoreError::NotFound(42))));
    }
}
