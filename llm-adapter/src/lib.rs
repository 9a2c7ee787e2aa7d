//! LLM adapter: a narrow asynchronous interface with retry, rate-limit
//! spacing, and a degraded-mode fallback. Enum-dispatch, no `async-trait`
//! and no boxed trait objects, matching `mr_reviewer::review::llm::LlmClient`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response shape")]
    BadResponse,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `llm_provider` (spec §6): selects the backend; unknown values yield
    /// the degraded local placeholder.
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub min_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            min_interval: Duration::from_millis(500),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

const DEGRADED_DIAGNOSTIC: &str =
    "[LLM adapter running in degraded mode: no provider configured]";

/// Narrow async LLM interface. Construction never fails: an unconfigured
/// or unknown provider yields `Degraded`, which still answers every call.
pub enum LlmClient {
    Configured(ConfiguredClient),
    Degraded(DegradedClient),
}

impl LlmClient {
    pub fn build(config: LlmConfig) -> Self {
        match config.provider.to_lowercase().as_str() {
            "ollama" => LlmClient::Configured(ConfiguredClient::new(config)),
            other => {
                tracing::warn!(provider = other, "llm-adapter: unknown provider, using degraded mode");
                LlmClient::Degraded(DegradedClient)
            }
        }
    }

    /// `complete(system, user, temperature?, max_tokens) -> text`. Never
    /// fails: adapter-level errors are encoded as `[LLM error: ...]` text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: u32,
    ) -> String {
        match self {
            LlmClient::Configured(c) => c.complete(system, user, temperature, max_tokens).await,
            LlmClient::Degraded(d) => d.complete(),
        }
    }

    /// Streaming variant. Since the real endpoint is an external
    /// collaborator (spec §1), this simulates chunking by splitting the
    /// completed text into fixed-size pieces rather than truly streaming
    /// tokens from a transport.
    pub async fn complete_stream(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: u32,
    ) -> Vec<String> {
        let text = self.complete(system, user, temperature, max_tokens).await;
        chunk_text(&text, 64)
    }
}

fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.chars()
        .collect::<Vec<_>>()
        .chunks(chunk_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

pub struct DegradedClient;

impl DegradedClient {
    fn complete(&self) -> String {
        DEGRADED_DIAGNOSTIC.to_string()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct ConfiguredClient {
    http: reqwest::Client,
    config: LlmConfig,
    last_request: Mutex<Option<Instant>>,
}

impl ConfiguredClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            last_request: Mutex::new(None),
        }
    }

    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: u32,
    ) -> String {
        let _ = (temperature, max_tokens);
        self.wait_rate_limit().await;

        for attempt in 0..self.config.max_retries {
            match self.try_once(system, user).await {
                Ok(text) => return text,
                Err(err) => {
                    if attempt == self.config.max_retries - 1 {
                        tracing::warn!(%err, attempt, "llm-adapter: giving up after retries");
                        return format!("[LLM error: {err}]");
                    }
                    let delay = self.config.retry_delay * (attempt + 1);
                    tracing::debug!(%err, attempt, ?delay, "llm-adapter: retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        format!("[LLM error: no attempts made (max_retries={})]", self.config.max_retries)
    }

    async fn wait_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_interval {
                tokio::time::sleep(self.config.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn try_once(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.config.model,
            prompt: format!("{system}\n\n{user}"),
            stream: false,
        };
        let response = self.http.post(url).json(&body).send().await?;
        let parsed: GenerateResponse = response.error_for_status()?.json().await?;
        if parsed.response.is_empty() {
            return Err(LlmError::BadResponse);
        }
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_provider_yields_degraded_mode() {
        let client = LlmClient::build(LlmConfig {
            provider: "made-up".to_string(),
            ..Default::default()
        });
        let text = client.complete("sys", "user", None, 100).await;
        assert_eq!(text, DEGRADED_DIAGNOSTIC);
    }

    #[test]
    fn chunking_splits_without_losing_text() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks.join(""), "abcdefghij");
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn empty_text_chunks_to_nothing() {
        assert!(chunk_text("", 4).is_empty());
    }
}
