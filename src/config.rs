//! Text-generation configuration
//!
//! The model identifier, sampling temperature and token limit are fixed per
//! call. Configuration comes from a YAML/JSON file or from the environment.

use crate::nlq::{NLQError, NLQResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Supported LLM back-ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LLMProvider {
    OpenAI,
    Ollama,
    Gemini,
    AzureOpenAI,
    Anthropic,
}

impl LLMProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Ollama => "http://localhost:11434",
            LLMProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            LLMProvider::AzureOpenAI => "",
            LLMProvider::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Ollama)
    }
}

/// Configuration for natural-language-to-Cypher generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NLQConfig {
    /// Enabled status
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The LLM provider to use
    pub provider: LLMProvider,
    /// Model name (e.g., "gpt-4o-mini", "llama3")
    #[serde(default = "default_model")]
    pub model: String,
    /// API Key (optional for Ollama)
    #[serde(default)]
    pub api_key: Option<String>,
    /// API Base URL (required for Azure, optional for others)
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Extra instructions appended to the built-in system prompts
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    800
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl NLQConfig {
    pub fn new(provider: LLMProvider, model: impl Into<String>) -> Self {
        Self {
            enabled: true,
            provider,
            model: model.into(),
            api_key: None,
            api_base_url: None,
            system_prompt: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// OpenAI-compatible configuration from `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `OPENAI_MODEL_CYPHER` and `OPENAI_MODEL`. `None` when no key is set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_blank = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = non_blank("OPENAI_API_KEY")?;
        let model = non_blank("OPENAI_MODEL_CYPHER")
            .or_else(|| non_blank("OPENAI_MODEL"))
            .unwrap_or_else(default_model);

        let mut config = Self::new(LLMProvider::OpenAI, model);
        config.api_key = Some(api_key);
        config.api_base_url = non_blank("OPENAI_BASE_URL");
        Some(config)
    }

    /// Load from a YAML or JSON file
    pub fn from_path(path: impl AsRef<Path>) -> NLQResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NLQError::ConfigError(format!("{}: {}", path.as_ref().display(), e)))?;
        serde_yaml::from_str(&raw).map_err(|e| NLQError::ConfigError(e.to_string()))
    }

    /// Enabled, and carrying a key when the provider needs one
    pub fn is_usable(&self) -> bool {
        self.enabled
            && (!self.provider.requires_api_key()
                || self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()))
    }
}
