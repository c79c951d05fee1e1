//! Chat-completion clients and the per-page summary call.
//!
//! [`CompletionClient`] is the seam between the driver and whatever serves
//! completions. [`ProviderClient`] is the shipped implementation: it wraps an
//! `edgequake_llm` provider, either Groq through the OpenAI-compatible
//! provider ([`groq_client`]) or any provider selected by name.
//!
//! Every request is a single user message: the instruction followed by the
//! page text. No system prompt, no history, no retries.

use crate::config::SummaryConfig;
use crate::error::PdfSumError;
use crate::output::PageSummary;
use crate::prompts::{build_prompt, SUMMARY_INSTRUCTION};
use edgequake_llm::{
    ChatMessage, ConfigProviderType, LLMProvider, LlmError, OpenAICompatibleProvider,
    ProviderConfig, ProviderFactory,
};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Environment variable holding the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Provider name used for the Groq endpoint.
pub const GROQ_PROVIDER: &str = "groq";

/// HTTP status embedded in `LlmError::ApiError` messages
/// (`"groq API 401: ..."`, `"groq API error 429: ..."`).
static RE_API_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bAPI (?:error )?(\d{3})\b").unwrap());

/// Sends one prompt and returns the first completion's text.
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, PdfSumError>>;
}

/// Summarize one page.
///
/// The prompt is the instruction (config override or
/// [`SUMMARY_INSTRUCTION`]) concatenated directly with `page_text`. The
/// completion text is returned verbatim.
pub async fn summarize_page(
    client: &dyn CompletionClient,
    page_num: usize,
    page_text: &str,
    config: &SummaryConfig,
) -> Result<PageSummary, PdfSumError> {
    let start = Instant::now();
    let instruction = config.instruction.as_deref().unwrap_or(SUMMARY_INSTRUCTION);
    let prompt = build_prompt(instruction, page_text);

    let text = client.complete(&prompt).await?;
    let duration = start.elapsed();
    debug!(
        "Page {}: {} prompt chars → {} summary chars in {:?}",
        page_num,
        prompt.len(),
        text.len(),
        duration
    );

    Ok(PageSummary {
        page_num,
        text,
        duration_ms: duration.as_millis() as u64,
    })
}

/// Pick the client the config asks for.
///
/// A `provider_name` selects an `edgequake_llm` provider; otherwise the
/// OpenAI-compatible endpoint at `api_base_url` is used with `api_key` or
/// `GROQ_API_KEY`.
pub fn client_from_config(
    config: &SummaryConfig,
) -> Result<Arc<dyn CompletionClient>, PdfSumError> {
    match config.provider_name.as_deref() {
        Some(name) => Ok(Arc::new(ProviderClient::create(name, &config.model)?)),
        None => Ok(Arc::new(groq_client(config)?)),
    }
}

// ── Groq (OpenAI-compatible) ─────────────────────────────────────────────────

/// Provider settings for the OpenAI-compatible endpoint at `api_base_url`.
///
/// An explicit `api_key` is sent as a bearer header; otherwise the provider
/// reads `GROQ_API_KEY` itself.
pub fn groq_provider_config(config: &SummaryConfig) -> Result<ProviderConfig, PdfSumError> {
    let explicit_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let env_key_set = std::env::var(GROQ_API_KEY_ENV)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false);

    let mut headers = HashMap::new();
    let api_key_env = match explicit_key {
        Some(key) => {
            headers.insert("Authorization".to_string(), format!("Bearer {key}"));
            None
        }
        None if env_key_set => Some(GROQ_API_KEY_ENV.to_string()),
        None => {
            return Err(PdfSumError::ProviderNotConfigured {
                provider: GROQ_PROVIDER.to_string(),
                hint: format!("Set {GROQ_API_KEY_ENV} or pass an API key explicitly."),
            });
        }
    };

    let mut provider_config = ProviderConfig {
        name: GROQ_PROVIDER.to_string(),
        display_name: "Groq".to_string(),
        provider_type: ConfigProviderType::OpenAICompatible,
        api_key_env,
        base_url: Some(config.api_base_url.clone()),
        default_llm_model: Some(config.model.clone()),
        headers,
        ..ProviderConfig::default()
    };
    if let Some(secs) = config.api_timeout_secs {
        provider_config.timeout_seconds = secs;
    }
    Ok(provider_config)
}

/// Client for Groq's chat completions API with the configured model.
pub fn groq_client(config: &SummaryConfig) -> Result<ProviderClient, PdfSumError> {
    let provider = OpenAICompatibleProvider::from_config(groq_provider_config(config)?)
        .map_err(|e| map_llm_error(GROQ_PROVIDER, e))?
        .with_model(config.model.clone());
    Ok(ProviderClient::new(Arc::new(provider)))
}

/// Map a provider error onto the error taxonomy.
///
/// The OpenAI-compatible provider reports HTTP failures as `ApiError` with
/// the status in the message, so 401/403 and 429 are recovered from there.
fn map_llm_error(provider: &str, err: LlmError) -> PdfSumError {
    match err {
        LlmError::AuthError(detail) => PdfSumError::AuthError {
            provider: provider.to_string(),
            detail,
        },
        LlmError::RateLimited(_) => PdfSumError::RateLimitExceeded {
            provider: provider.to_string(),
            retry_after_secs: None,
        },
        LlmError::ConfigError(hint) => PdfSumError::ProviderNotConfigured {
            provider: provider.to_string(),
            hint,
        },
        LlmError::ApiError(message) => {
            let status = RE_API_STATUS
                .captures(&message)
                .and_then(|c| c[1].parse::<u16>().ok());
            match status {
                Some(401 | 403) => PdfSumError::AuthError {
                    provider: provider.to_string(),
                    detail: message,
                },
                Some(429) => PdfSumError::RateLimitExceeded {
                    provider: provider.to_string(),
                    retry_after_secs: None,
                },
                _ => PdfSumError::LlmApiError { message },
            }
        }
        other => PdfSumError::LlmApiError {
            message: other.to_string(),
        },
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────────

/// An `edgequake_llm` provider (groq, openai, anthropic, ollama, ...).
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient").finish_non_exhaustive()
    }
}

impl ProviderClient {
    /// Wrap an already-configured provider.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Instantiate `name` with `model`; credentials come from the provider's
    /// usual environment variables.
    pub fn create(name: &str, model: &str) -> Result<Self, PdfSumError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            PdfSumError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider))
    }

    async fn send(&self, prompt: &str) -> Result<String, PdfSumError> {
        let messages = vec![ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, None)
            .await
            .map_err(|e| map_llm_error(self.provider.name(), e))?;
        if response.content.is_empty() {
            return Err(PdfSumError::EmptyCompletion {
                model: self.provider.model().to_string(),
            });
        }
        Ok(response.content)
    }
}

impl CompletionClient for ProviderClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, PdfSumError>> {
        Box::pin(self.send(prompt))
    }
}
