//! Natural Language Querying (NLQ)
//!
//! Implements Text-to-Cypher translation. A configured text generator is
//! asked first; its answer is validated against the schema and retried once
//! with the validation errors. When that fails, or the generator returns
//! nothing usable, the rule-based path (analyzer, chain builder, generator)
//! takes over. At most two generator calls are made per request.

pub mod analyzer;
pub mod chain;
pub mod client;
pub mod extract;
pub mod generator;
pub mod prompt;
pub mod validator;

pub use analyzer::{analyze, AmountFilter, AnalysisResult, ComparisonOp, OrderBy, SortDirection};
pub use chain::{build_path_chain, PathChain, PathSegment};
pub use client::{CompletionRequest, LlmClient, TextGenerator};
pub use extract::{extract_cypher, normalize_cypher};
pub use generator::generate_cypher;
pub use validator::{validate_cypher, ValidationReport};

use crate::config::NLQConfig;
use crate::schema::{GraphSchema, SchemaError, SchemaProvider};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum NLQError {
    #[error("LLM API error: {0}")]
    ApiError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

pub type NLQResult<T> = Result<T, NLQError>;

pub const EMPTY_QUERY_ERROR: &str = "Empty query";
pub const NO_VALID_CYPHER_ERROR: &str = "LLM did not return valid Cypher.";

const NOT_CONFIGURED_ERROR: &str =
    "Text generation is not configured: OPENAI_API_KEY or an NLQ config file is required";

/// Longest response excerpt written to the log
const RESPONSE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    Llm,
    RuleBased,
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Llm => f.write_str("llm"),
            QuerySource::RuleBased => f.write_str("rule_based"),
        }
    }
}

/// Final statement of one translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    pub text: String,
    pub source: QuerySource,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl GeneratedQuery {
    fn accepted(text: String, source: QuerySource) -> Self {
        Self { text, source, valid: true, errors: Vec::new() }
    }

    fn rejected(text: String, errors: Vec<String>) -> Self {
        Self { text, source: QuerySource::Llm, valid: false, errors }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub query: GeneratedQuery,
    /// Populated only when the rule-based path ran
    pub analysis: AnalysisResult,
    pub llm_calls: usize,
}

impl Translation {
    fn new(query: GeneratedQuery, analysis: AnalysisResult, llm_calls: usize) -> Self {
        Self { query, analysis, llm_calls }
    }
}

/// Result of one generator round trip
#[derive(Debug)]
pub enum CallOutcome {
    /// Extracted and normalized statement, not yet validated
    Candidate(String),
    NoStatement,
    Failed(NLQError),
}

enum Capability {
    Ready(Arc<dyn TextGenerator>),
    Missing(String),
}

/// Rule-based translation of `text`, validated
pub fn rule_based_translation(text: &str, schema: &GraphSchema) -> (GeneratedQuery, AnalysisResult) {
    let analysis = analyze(text, schema);
    let cypher = normalize_cypher(&generate_cypher(&analysis, schema));
    let report = validate_cypher(&cypher, schema);
    let query = GeneratedQuery {
        text: cypher,
        source: QuerySource::RuleBased,
        valid: report.valid,
        errors: report.errors,
    };
    (query, analysis)
}

pub struct NLQPipeline {
    capability: Capability,
    system_prompt: Option<String>,
}

impl NLQPipeline {
    /// Build from a configuration. A disabled or key-less configuration
    /// yields a pipeline that reports the missing configuration on every call.
    pub fn new(config: NLQConfig) -> NLQResult<Self> {
        if !config.is_usable() {
            let reason = if config.enabled {
                format!("{:?} requires an API key", config.provider)
            } else {
                "Text generation is disabled in the NLQ configuration".to_string()
            };
            return Ok(Self { capability: Capability::Missing(reason), system_prompt: None });
        }
        let client = LlmClient::new(&config)?;
        Ok(Self {
            capability: Capability::Ready(Arc::new(client)),
            system_prompt: config.system_prompt,
        })
    }

    /// OpenAI-compatible pipeline from the environment
    pub fn from_env() -> NLQResult<Self> {
        match NLQConfig::from_env() {
            Some(config) => Self::new(config),
            None => Ok(Self::unconfigured()),
        }
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self { capability: Capability::Ready(generator), system_prompt: None }
    }

    pub fn unconfigured() -> Self {
        Self { capability: Capability::Missing(NOT_CONFIGURED_ERROR.to_string()), system_prompt: None }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.capability, Capability::Ready(_))
    }

    /// Load the schema from `provider`, then translate
    pub async fn translate_with(
        &self,
        text: &str,
        provider: &dyn SchemaProvider,
    ) -> NLQResult<Translation> {
        let schema = provider.load()?;
        Ok(self.translate(text, &schema).await)
    }

    /// Translate `text` into a validated Cypher statement.
    ///
    /// Expected failures never surface as `Err`; they come back as an invalid
    /// query with its errors. No timeout is applied here.
    pub async fn translate(&self, text: &str, schema: &GraphSchema) -> Translation {
        let question = text.trim();
        if question.is_empty() {
            return Translation::new(
                GeneratedQuery::rejected(String::new(), vec![EMPTY_QUERY_ERROR.to_string()]),
                AnalysisResult::default(),
                0,
            );
        }

        let generator = match &self.capability {
            Capability::Ready(generator) => generator.as_ref(),
            Capability::Missing(reason) => {
                warn!("Translation requested without a text generator: {}", reason);
                return Translation::new(
                    GeneratedQuery::rejected(String::new(), vec![reason.clone()]),
                    AnalysisResult::default(),
                    0,
                );
            }
        };

        info!("Translating question ({} chars)", question.len());
        let mut calls = 0;

        let request = prompt::initial_prompt(question, schema, self.system_prompt.as_deref());
        let candidate = match self.call(generator, &request, &mut calls).await {
            CallOutcome::Candidate(candidate) => candidate,
            CallOutcome::NoStatement | CallOutcome::Failed(_) => {
                let (query, analysis) = rule_based_translation(question, schema);
                if query.valid {
                    info!("Using rule-based Cypher after generator miss");
                    return Translation::new(query, analysis, calls);
                }
                debug!("Rule-based fallback also invalid: {:?}", query.errors);
                return Translation::new(
                    GeneratedQuery::rejected(String::new(), vec![NO_VALID_CYPHER_ERROR.to_string()]),
                    AnalysisResult::default(),
                    calls,
                );
            }
        };

        let report = validate_cypher(&candidate, schema);
        if report.valid {
            info!("Generated Cypher passed validation");
            return Translation::new(
                GeneratedQuery::accepted(candidate, QuerySource::Llm),
                AnalysisResult::default(),
                calls,
            );
        }

        info!("Generated Cypher failed validation with {} error(s), retrying", report.errors.len());
        let mut last_text = candidate;
        let mut errors = report.errors;

        let request =
            prompt::retry_prompt(question, schema, &errors, self.system_prompt.as_deref());
        if let CallOutcome::Candidate(retried) = self.call(generator, &request, &mut calls).await {
            let report = validate_cypher(&retried, schema);
            if report.valid {
                info!("Corrected Cypher passed validation");
                return Translation::new(
                    GeneratedQuery::accepted(retried, QuerySource::Llm),
                    AnalysisResult::default(),
                    calls,
                );
            }
            last_text = retried;
            errors = report.errors;
        }

        let (query, analysis) = rule_based_translation(question, schema);
        if query.valid {
            info!("Using rule-based Cypher after failed retry");
            return Translation::new(query, analysis, calls);
        }

        for error in query.errors {
            if !errors.contains(&error) {
                errors.push(error);
            }
        }
        warn!("No valid Cypher produced after {} generator call(s)", calls);
        Translation::new(GeneratedQuery::rejected(last_text, errors), analysis, calls)
    }

    async fn call(
        &self,
        generator: &dyn TextGenerator,
        request: &CompletionRequest,
        calls: &mut usize,
    ) -> CallOutcome {
        *calls += 1;
        debug!("Prompt #{}: {}", calls, request.user);
        match generator.complete(request).await {
            Ok(response) => match extract_cypher(&response) {
                Some(candidate) => CallOutcome::Candidate(candidate),
                None => {
                    warn!("LLM response did not contain Cypher: {}", preview(&response));
                    CallOutcome::NoStatement
                }
            },
            Err(e) => {
                warn!("LLM Cypher generation failed: {}", e);
                CallOutcome::Failed(e)
            }
        }
    }
}

fn preview(response: &str) -> String {
    response.chars().take(RESPONSE_PREVIEW_CHARS).collect()
}
