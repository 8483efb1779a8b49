//! Model transport: send one prompt, get back the model's raw text.
//!
//! Everything downstream of this module only needs "the raw text or why it
//! failed", so the transport surface is a single trait, [`TextGenerator`].
//! Two implementations ship with the crate:
//!
//! - [`OllamaGenerator`] speaks the Ollama `/api/generate` protocol directly
//!   with `format: "json"`, which is what the extraction prompts are tuned
//!   for;
//! - [`ProviderGenerator`] routes the prompt through any `edgequake-llm`
//!   provider (OpenAI, Anthropic, Gemini, Ollama, …) as one user message.
//!
//! Tests inject their own implementation; no network is needed to exercise
//! the orchestrator.
//!
//! ## Timeouts
//!
//! A request carries its own timeout. [`call_model`] enforces it with
//! `tokio::time::timeout` around the whole call, and `OllamaGenerator` also
//! hands it to reqwest so the socket is closed promptly. No retries happen
//! here; a timeout is reported as [`ExtractError::Timeout`].

use crate::config::ExtractionConfig;
use crate::error::{snippet, ExtractError, StudyGenError};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Characters of an error body kept in [`ExtractError::Status`].
const BODY_SNIPPET_CHARS: usize = 200;

/// One prompt to send to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Sampling temperature; `None` leaves the model default.
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            timeout,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A text-generation backend.
pub trait TextGenerator: Send + Sync {
    /// Send `request` and return the model's raw text output.
    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl Future<Output = Result<String, ExtractError>> + Send;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Call `generator` with the request's timeout and reject blank output.
pub async fn call_model<G: TextGenerator>(
    generator: &G,
    request: &GenerateRequest,
) -> Result<String, ExtractError> {
    debug!(
        "Calling {} ({} prompt chars, timeout {:?})",
        generator.model_name(),
        request.prompt.chars().count(),
        request.timeout
    );
    let raw = tokio::time::timeout(request.timeout, generator.generate(request))
        .await
        .map_err(|_| ExtractError::Timeout {
            secs: request.timeout.as_secs(),
        })??;

    if raw.trim().is_empty() {
        return Err(ExtractError::EmptyResponse);
    }
    debug!("Model returned {} chars", raw.chars().count());
    Ok(raw)
}

// ── Ollama ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

/// [`TextGenerator`] for the Ollama `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    /// Build a generator for `model` served at `base_url`.
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self, StudyGenError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StudyGenError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    /// Build a generator from the configured host and model.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, StudyGenError> {
        Self::new(&config.base_url, config.model.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextGenerator for OllamaGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError> {
        let body = OllamaRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            format: "json",
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Ollama returned HTTP {}: {}", status, snippet(&text, BODY_SNIPPET_CHARS));
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body: snippet(&text, BODY_SNIPPET_CHARS),
            });
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, request.timeout))?;
        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        ExtractError::Transport {
            detail: e.to_string(),
        }
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────────

/// [`TextGenerator`] backed by an `edgequake-llm` provider.
#[derive(Clone)]
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: Option<usize>,
}

impl std::fmt::Debug for ProviderGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGenerator")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }
}

impl TextGenerator for ProviderGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError> {
        let messages = vec![ChatMessage::user(request.prompt.as_str())];
        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        };
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractError::Transport {
                detail: e.to_string(),
            })?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Instantiate a named `edgequake-llm` provider.
pub fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, StudyGenError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StudyGenError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve a provider, from most-specific to least-specific.
///
/// 1. `provider_name` (+ `model`, or the provider's default) when given;
/// 2. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set;
/// 3. `ProviderFactory::from_env` auto-detection over known API keys.
pub fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, StudyGenError> {
    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudyGenError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
