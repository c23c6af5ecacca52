//! LLM client — the single point of entry for completion calls.
//!
//! ARCHITECTURAL RULE: no other module may call the completion API directly;
//! all model interactions go through this module, and upstream failures are
//! classified here, once, into the closed [`UpstreamError`] taxonomy. The
//! rest of the pipeline never inspects raw statuses or error bodies.
//!
//! There is no retry logic: a single upstream failure terminates the request
//! and any retry policy belongs to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
/// The model used for all completion calls.
/// Intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gpt-4o-mini";

/// Closed set of upstream failure causes, classified once at this boundary.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream authentication failed: {0}")]
    Auth(String),

    #[error("upstream quota or billing exhausted: {0}")]
    Quota(String),

    #[error("upstream rejected the request: {0}")]
    MalformedRequest(String),

    #[error("upstream transiently unavailable: {0}")]
    Transient(String),
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 150,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The single completion client used by the generation pipeline.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Sends one completion request and returns the raw completion text.
    /// A failure is classified and returned; the call is never retried here.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, UpstreamError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            top_p: sampling.top_p,
        };

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status(status.as_u16(), message));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Transient(format!("malformed completion body: {e}")))?;

        if let Some(usage) = &completion.usage {
            debug!(
                "completion call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(UpstreamError::Transient(
                "completion contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

/// Maps an HTTP status from the completion API onto the closed taxonomy.
fn classify_status(status: u16, message: String) -> UpstreamError {
    match status {
        401 | 403 => UpstreamError::Auth(message),
        402 | 429 => UpstreamError::Quota(message),
        400 | 404 | 413 | 422 => UpstreamError::MalformedRequest(message),
        _ => UpstreamError::Transient(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses_classify_as_auth() {
        assert!(matches!(
            classify_status(401, String::new()),
            UpstreamError::Auth(_)
        ));
        assert!(matches!(
            classify_status(403, String::new()),
            UpstreamError::Auth(_)
        ));
    }

    #[test]
    fn test_quota_statuses_classify_as_quota() {
        assert!(matches!(
            classify_status(429, String::new()),
            UpstreamError::Quota(_)
        ));
        assert!(matches!(
            classify_status(402, String::new()),
            UpstreamError::Quota(_)
        ));
    }

    #[test]
    fn test_client_errors_classify_as_malformed_request() {
        assert!(matches!(
            classify_status(400, String::new()),
            UpstreamError::MalformedRequest(_)
        ));
    }

    #[test]
    fn test_server_errors_classify_as_transient() {
        for status in [500, 502, 503] {
            assert!(matches!(
                classify_status(status, String::new()),
                UpstreamError::Transient(_)
            ));
        }
    }

    #[test]
    fn test_error_body_message_is_extracted() {
        let body = r#"{"error": {"message": "invalid api key", "type": "auth"}}"#;
        let parsed: ApiError = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "invalid api key");
    }
}
