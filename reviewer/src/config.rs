//! Review configuration, loaded from the environment with the same
//! tolerant-parse-or-default policy as
//! `codegraph_prep::config::model::GraphConfig::load_from_env_or_default`:
//! unknown/unparsable variables are ignored, and a `validate()` pass runs
//! after load.

use std::env;
use std::path::PathBuf;

use context_assembler::AssemblerConfig;
use llm_adapter::LlmConfig;
use prompt_composer::BatchedPromptConfig;
use repo_graph::RetrievalConfig;

use crate::errors::ReviewError;

/// Review mode (spec §4.8). Unknown values fall back to `Batched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    Batched,
    PerUnit,
    Both,
}

impl ReviewMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "per_unit" => ReviewMode::PerUnit,
            "both" => ReviewMode::Both,
            _ => ReviewMode::Batched,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Language tag -> list of file extensions (including the leading dot).
    pub supported_languages: Vec<(String, Vec<String>)>,
    pub mode: ReviewMode,
    /// Root for worktrees; an external concern the core only forwards.
    pub repo_checkout_root: PathBuf,
    pub retrieval: RetrievalConfig,
    pub assembler: AssemblerConfig,
    pub batched_prompt: BatchedPromptConfig,
    pub llm: LlmConfig,
    pub llm_max_tokens: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            supported_languages: vec![("python".to_string(), vec![".py".to_string()])],
            mode: ReviewMode::Batched,
            repo_checkout_root: PathBuf::from("."),
            retrieval: RetrievalConfig::default(),
            assembler: AssemblerConfig::default(),
            batched_prompt: BatchedPromptConfig::default(),
            llm: LlmConfig::default(),
            llm_max_tokens: 1024,
        }
    }
}

impl ReviewConfig {
    /// Supported ENV vars (all optional):
    /// - `REVIEW_MODE`                     (batched|per_unit|both)
    /// - `REVIEW_PYTHON_EXTENSIONS`        (comma-separated, e.g. ".py,.pyi")
    /// - `REVIEW_REPO_CHECKOUT_ROOT`       (path)
    /// - `REVIEW_MAX_NODES_PER_UNIT`       (usize)
    /// - `REVIEW_MAX_TOKENS_PER_UNIT`      (usize)
    /// - `REVIEW_LLM_PROVIDER`             (string)
    /// - `REVIEW_LLM_MODEL`                (string)
    /// - `REVIEW_LLM_ENDPOINT`             (string)
    /// - `REVIEW_LLM_MIN_INTERVAL_MS`      (u64)
    /// - `REVIEW_LLM_MAX_RETRIES`          (u32)
    /// - `REVIEW_LLM_RETRY_DELAY_MS`       (u64)
    /// - `REVIEW_LLM_MAX_TOKENS`           (u32)
    ///
    /// Recognised-but-ignored (external concerns, spec §6):
    /// `REVIEW_WEBHOOK_SECRET`, `REVIEW_PROVIDER_TOKEN`.
    pub fn load_from_env_or_default() -> Result<Self, ReviewError> {
        let mut cfg = Self::default();

        if let Ok(raw) = env::var("REVIEW_MODE") {
            cfg.mode = ReviewMode::parse(&raw);
        }
        if let Some(exts) = env_list("REVIEW_PYTHON_EXTENSIONS") {
            cfg.supported_languages = vec![("python".to_string(), exts)];
        }
        if let Ok(raw) = env::var("REVIEW_REPO_CHECKOUT_ROOT") {
            cfg.repo_checkout_root = PathBuf::from(raw);
        }

        if let Some(v) = env_usize("REVIEW_MAX_NODES_PER_UNIT") {
            cfg.retrieval.max_nodes_per_unit = v;
        }
        if let Some(v) = env_usize("REVIEW_MAX_TOKENS_PER_UNIT") {
            cfg.assembler.max_tokens_per_unit = v;
        }

        if let Ok(raw) = env::var("REVIEW_LLM_PROVIDER") {
            cfg.llm.provider = raw;
        }
        if let Ok(raw) = env::var("REVIEW_LLM_MODEL") {
            cfg.llm.model = raw;
        }
        if let Ok(raw) = env::var("REVIEW_LLM_ENDPOINT") {
            cfg.llm.endpoint = raw;
        }
        if let Some(v) = env_u64("REVIEW_LLM_MIN_INTERVAL_MS") {
            cfg.llm.min_interval = std::time::Duration::from_millis(v);
        }
        if let Some(v) = env_u64("REVIEW_LLM_RETRY_DELAY_MS") {
            cfg.llm.retry_delay = std::time::Duration::from_millis(v);
        }
        if let Some(v) = env_usize("REVIEW_LLM_MAX_RETRIES") {
            cfg.llm.max_retries = v as u32;
        }
        if let Some(v) = env_usize("REVIEW_LLM_MAX_TOKENS") {
            cfg.llm_max_tokens = v as u32;
        }

        // External concerns the core ignores (spec §6); read only so a
        // typo'd name shows up in logs rather than silently doing nothing.
        if env::var("REVIEW_WEBHOOK_SECRET").is_ok() {
            tracing::debug!("reviewer: REVIEW_WEBHOOK_SECRET present, ignored by core");
        }
        if env::var("REVIEW_PROVIDER_TOKEN").is_ok() {
            tracing::debug!("reviewer: REVIEW_PROVIDER_TOKEN present, ignored by core");
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.retrieval.max_nodes_per_unit == 0 {
            return Err(ReviewError::Config(
                "max_nodes_per_unit must be greater than 0".to_string(),
            ));
        }
        if self.assembler.max_tokens_per_unit == 0 {
            return Err(ReviewError::Config(
                "max_tokens_per_unit must be greater than 0".to_string(),
            ));
        }
        if self.supported_languages.is_empty() {
            return Err(ReviewError::Config(
                "supported_languages must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let list: Vec<String> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if list.is_empty() { None } else { Some(list) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_defaults_to_batched_on_unknown() {
        assert_eq!(ReviewMode::parse("bogus"), ReviewMode::Batched);
        assert_eq!(ReviewMode::parse("PER_UNIT"), ReviewMode::PerUnit);
        assert_eq!(ReviewMode::parse("both"), ReviewMode::Both);
    }

    #[test]
    fn default_config_validates() {
        assert!(ReviewConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_budget_fails_validation() {
        let mut cfg = ReviewConfig::default();
        cfg.retrieval.max_nodes_per_unit = 0;
        assert!(cfg.validate().is_err());
    }
}
