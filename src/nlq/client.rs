//! Text-generation client for LLM interactions

use crate::config::{LLMProvider, NLQConfig};
use crate::nlq::{NLQError, NLQResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One prompt for the text generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Black-box prompt -> text capability. No structured output is assumed.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> NLQResult<String>;
}

/// HTTP client for the configured provider
pub struct LlmClient {
    client: Client,
    config: NLQConfig,
    api_base_url: String,
}

impl LlmClient {
    pub fn new(config: &NLQConfig) -> NLQResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| NLQError::ConfigError(e.to_string()))?;

        let api_base_url = config
            .api_base_url
            .clone()
            .unwrap_or_else(|| config.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        if api_base_url.is_empty() {
            return Err(NLQError::ConfigError(format!(
                "Provider {:?} requires api_base_url",
                config.provider
            )));
        }

        Ok(Self { client, config: config.clone(), api_base_url })
    }

    pub fn config(&self) -> &NLQConfig {
        &self.config
    }

    fn api_key(&self) -> NLQResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NLQError::ConfigError(format!("{:?} requires API key", self.config.provider)))
    }

    async fn openai_chat(&self, request: &CompletionRequest) -> NLQResult<String> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MessageContent,
        }

        #[derive(Deserialize)]
        struct MessageContent {
            content: Option<String>,
        }

        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.api_base_url);
        let builder = self.client.post(&url);
        let builder = match self.config.provider {
            LLMProvider::AzureOpenAI => builder.header("api-key", api_key),
            _ => builder.header("Authorization", format!("Bearer {}", api_key)),
        };

        let resp = builder
            .json(&Request {
                model: &self.config.model,
                messages: vec![
                    Message { role: "system", content: &request.system },
                    Message { role: "user", content: &request.user },
                ],
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            })
            .send()
            .await
            .map_err(|e| NLQError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NLQError::ApiError(format!("OpenAI error: {}", resp.status())));
        }

        let result: Response =
            resp.json().await.map_err(|e| NLQError::SerializationError(e.to_string()))?;
        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn ollama_generate(&self, request: &CompletionRequest) -> NLQResult<String> {
        #[derive(Serialize)]
        struct Options {
            temperature: f32,
            num_predict: u32,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            prompt: &'a str,
            system: &'a str,
            stream: bool,
            options: Options,
        }

        #[derive(Deserialize)]
        struct Response {
            response: String,
        }

        let url = format!("{}/api/generate", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&Request {
                model: &self.config.model,
                prompt: &request.user,
                system: &request.system,
                stream: false,
                options: Options {
                    temperature: self.config.temperature,
                    num_predict: self.config.max_tokens,
                },
            })
            .send()
            .await
            .map_err(|e| NLQError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NLQError::ApiError(format!("Ollama error: {}", resp.status())));
        }

        let result: Response =
            resp.json().await.map_err(|e| NLQError::SerializationError(e.to_string()))?;
        Ok(result.response)
    }

    async fn gemini_generate(&self, request: &CompletionRequest) -> NLQResult<String> {
        #[derive(Serialize)]
        struct Request {
            contents: Vec<Content>,
            #[serde(rename = "generationConfig")]
            generation_config: GenerationConfig,
        }

        #[derive(Serialize, Deserialize)]
        struct Content {
            role: Option<String>,
            parts: Vec<Part>,
        }

        #[derive(Serialize, Deserialize)]
        struct Part {
            text: String,
        }

        #[derive(Serialize)]
        struct GenerationConfig {
            temperature: f32,
            #[serde(rename = "maxOutputTokens")]
            max_output_tokens: u32,
        }

        #[derive(Deserialize)]
        struct Response {
            candidates: Option<Vec<Candidate>>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }

        let api_key = self.api_key()?;
        // v1beta has no dedicated system turn on every endpoint
        let prompt = format!("{}\n\n{}", request.system, request.user);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base_url, self.config.model, api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&Request {
                contents: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part { text: prompt }],
                }],
                generation_config: GenerationConfig {
                    temperature: self.config.temperature,
                    max_output_tokens: self.config.max_tokens,
                },
            })
            .send()
            .await
            .map_err(|e| NLQError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(NLQError::ApiError(format!("Gemini error {}: {}", status, text)));
        }

        let result: Response =
            resp.json().await.map_err(|e| NLQError::SerializationError(e.to_string()))?;
        Ok(result
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default())
    }

    async fn anthropic_messages(&self, request: &CompletionRequest) -> NLQResult<String> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            system: &'a str,
            messages: Vec<Message<'a>>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            content: Vec<Block>,
        }

        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: Option<String>,
        }

        let api_key = self.api_key()?;
        let url = format!("{}/messages", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&Request {
                model: &self.config.model,
                system: &request.system,
                messages: vec![Message { role: "user", content: &request.user }],
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .send()
            .await
            .map_err(|e| NLQError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NLQError::ApiError(format!("Anthropic error: {}", resp.status())));
        }

        let result: Response =
            resp.json().await.map_err(|e| NLQError::SerializationError(e.to_string()))?;
        Ok(result.content.into_iter().filter_map(|b| b.text).collect::<Vec<_>>().join(""))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> NLQResult<String> {
        debug!("Requesting completion from {:?} model {}", self.config.provider, self.config.model);
        match self.config.provider {
            LLMProvider::OpenAI | LLMProvider::AzureOpenAI => self.openai_chat(request).await,
            LLMProvider::Ollama => self.ollama_generate(request).await,
            LLMProvider::Gemini => self.gemini_generate(request).await,
            LLMProvider::Anthropic => self.anthropic_messages(request).await,
        }
    }
}
