//! LLM configuration loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Endpoint, key and models for OpenAI-compatible APIs.
#[derive(Debug, Clone)]
pub struct EnvLlmConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model for chat, importers and vision calls.
    pub model: String,
    /// Model for the daily briefing; falls back to `model`.
    pub briefing_model: String,
}

impl EnvLlmConfig {
    /// Load from `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `MODEL` and `BRIEFING_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        let base_url = env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = env::var("MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let briefing_model = env::var("BRIEFING_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| model.clone());
        Ok(Self {
            api_key,
            base_url,
            model,
            briefing_model,
        })
    }
}
