//! Summarizer provider abstraction and implementations.
//!
//! Defines the [`Summarizer`] trait and concrete implementations:
//! - **[`MockSummarizer`]** — pure, deterministic output; used for tests
//!   and offline development.
//! - **[`LiveSummarizer`]** — fetches the page, extracts readable text, and
//!   calls an OpenAI-compatible chat-completions API with retry and backoff.
//!
//! # Provider Selection
//!
//! Use [`create_summarizer`] to instantiate the appropriate provider based
//! on the configuration. The provider is chosen once at startup and is not
//! switchable per request.
//!
//! # Retry Strategy
//!
//! The live provider retries transient API errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SummarizerConfig;
use crate::extract;

/// The fixed output of the mock provider. Tests poll for this exact text.
pub const MOCK_SUMMARY_TEXT: &str =
    "This is a mock summary generated for testing purposes. In production, this \
     would be an AI-generated summary of the page content.";

/// Upper bound on extracted text sent to the summarization API.
const MAX_INPUT_CHARS: usize = 50_000;

/// Trait for summarization providers.
///
/// Implementations turn a URL into summary text. Failures are terminal per
/// attempt; retry policy belongs to the caller (the background worker).
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider identifier for logs (e.g. `"mock"`, `"live"`).
    fn name(&self) -> &str;

    /// Produce a non-empty text summary for the given URL.
    async fn summarize(&self, url: &str) -> Result<String>;
}

// ============ Mock Provider ============

/// Deterministic provider with no side effects.
///
/// Used when `summarizer.provider = "mock"` in the configuration. Always
/// succeeds and always returns [`MOCK_SUMMARY_TEXT`].
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn summarize(&self, _url: &str) -> Result<String> {
        Ok(MOCK_SUMMARY_TEXT.to_string())
    }
}

// ============ Live Provider ============

/// Provider that fetches the page and calls a chat-completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable at construction time.
/// The API base URL is configurable so tests can point it at a local mock.
pub struct LiveSummarizer {
    model: String,
    api_base: String,
    api_key: String,
    timeout_secs: u64,
    max_retries: u32,
    max_words: usize,
}

impl LiveSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("summarizer.model required for live provider"))?;

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            max_words: config.max_words,
        })
    }

    /// Call the chat-completions API with retry/backoff.
    async fn complete(&self, text: &str) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let system_prompt = format!(
            "You are a helpful assistant that creates concise, informative summaries \
             of web pages. Keep summaries under {} words. Focus on the main points \
             and key takeaways.",
            self.max_words
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": format!("Please summarize this page:\n\n{}", text) },
            ],
            "temperature": 0.3,
            "max_tokens": 500,
        });

        let endpoint = format!("{}/chat/completions", self.api_base);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(&endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Summarization API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Summarization API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Summarization failed after retries")))
    }
}

#[async_trait]
impl Summarizer for LiveSummarizer {
    fn name(&self) -> &str {
        "live"
    }

    async fn summarize(&self, url: &str) -> Result<String> {
        let text = extract::fetch_article_text(url, self.timeout_secs).await?;

        let text = if text.chars().count() > MAX_INPUT_CHARS {
            tracing::warn!(url, "truncating extracted text to {} chars", MAX_INPUT_CHARS);
            text.chars().take(MAX_INPUT_CHARS).collect()
        } else {
            text
        };

        self.complete(&text).await
    }
}

/// Parse the chat-completions response JSON.
///
/// Extracts `choices[0].message.content` and rejects empty output.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid API response: missing choices[0].message.content"))?;

    let content = content.trim();
    if content.is_empty() {
        bail!("Summarization API returned an empty summary");
    }

    Ok(content.to_string())
}

/// Create the appropriate [`Summarizer`] based on configuration.
///
/// | Config Value | Provider |
/// |--------------|----------|
/// | `"mock"` | [`MockSummarizer`] |
/// | `"live"` | [`LiveSummarizer`] |
///
/// Returns an error for unknown provider names or if the live provider
/// cannot be initialized (missing model or API key).
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockSummarizer)),
        "live" => Ok(Arc::new(LiveSummarizer::new(config)?)),
        other => bail!("Unknown summarizer provider: {}", other),
    }
}
