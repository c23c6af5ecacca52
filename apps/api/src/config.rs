use std::str::FromStr;

use anyhow::{Context, Result};

use crate::pipeline::output::OutputLimits;

/// Application configuration loaded from environment variables.
/// Only the completion API key is required; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; when unset the JSON-file store is used.
    pub database_url: Option<String>,
    /// Directory for the JSON-file store.
    pub data_dir: String,
    pub openai_api_key: String,
    pub port: u16,
    pub rust_log: String,

    // Length governance, all counted in characters
    pub input_max_chars: usize,
    pub interpreted_max_chars: usize,
    pub official_max_chars: usize,
    pub combined_max_chars: usize,

    // Rate limiting
    pub client_hourly_cap: u32,
    pub global_hourly_cap: u32,
    pub rate_window_secs: i64,

    /// Upper bound on stored quotes rendered as few-shot examples.
    pub example_count: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok(),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            openai_api_key: require_env("OPENAI_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            input_max_chars: env_or("INPUT_MAX_CHARS", 25)?,
            interpreted_max_chars: env_or("INTERPRETED_MAX_CHARS", 102)?,
            official_max_chars: env_or("OFFICIAL_MAX_CHARS", 123)?,
            combined_max_chars: env_or("OUTPUT_BUDGET_CHARS", 210)?,
            client_hourly_cap: env_or("CLIENT_HOURLY_CAP", 20)?,
            global_hourly_cap: env_or("GLOBAL_HOURLY_CAP", 100)?,
            rate_window_secs: env_or("RATE_WINDOW_SECS", 3600)?,
            example_count: env_or("EXAMPLE_COUNT", 25)?,
        })
    }

    /// The length caps handed to the output pipeline.
    pub fn output_limits(&self) -> OutputLimits {
        OutputLimits {
            interpreted_max: self.interpreted_max_chars,
            official_max: self.official_max_chars,
            combined_max: self.combined_max_chars,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' is not a valid value")),
        Err(_) => Ok(default),
    }
}
