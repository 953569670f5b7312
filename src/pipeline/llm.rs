//! Model boundary: the [`TextModel`] seam, the provider-backed default and
//! the retrying call used by every model-backed stage.
//!
//! This module is intentionally thin: all prompt wording lives in
//! [`crate::prompts`] and all reply parsing in [`super::reply`], so either
//! can change without touching retry or timeout logic here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx errors and timeouts are transient. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`) with a 500 ms base and 3 retries
//! waits 500 ms → 1 s → 2 s. Authentication failures are returned at once.
//!
//! Transport retries are distinct from the stages' *conformance* attempts:
//! a reply that arrives but cannot be used (no JSON object, no HTML
//! document) is handled by the stage asking again, not here.

use crate::config::{PortfolioConfig, StageSettings, DEFAULT_MODEL};
use crate::error::{FolioError, ModelError};
use crate::output::StageStats;
use crate::session::Stage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// One text completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl CompletionRequest {
    /// A request using `settings`' sampling parameters.
    pub fn new(prompt: impl Into<String>, settings: &StageSettings) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// A model reply with its token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A remote (or scripted) text completion model.
///
/// The session holds one `Arc<dyn TextModel>` per stage, so tests can
/// substitute a scripted model without any network access.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Human-readable identifier for logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError>;
}

/// [`TextModel`] backed by an `edgequake_llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl TextModel for ProviderModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError> {
        let messages = vec![ChatMessage::user(request.prompt.as_str())];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Map a provider error message onto [`ModelError`].
pub(crate) fn classify_provider_error(message: &str) -> ModelError {
    let lower = message.to_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("authentication")
    {
        ModelError::Auth(message.to_string())
    } else if lower.contains("429") || lower.contains("rate limit") {
        ModelError::RateLimited
    } else {
        ModelError::Api(message.to_string())
    }
}

// ── Stage models ─────────────────────────────────────────────────────────

/// The model used by each of the three model-backed stages.
#[derive(Clone)]
pub struct StageModels {
    pub structurer: Arc<dyn TextModel>,
    pub selector: Arc<dyn TextModel>,
    pub layout: Arc<dyn TextModel>,
}

impl StageModels {
    /// Use one model for every stage.
    pub fn uniform(model: Arc<dyn TextModel>) -> Self {
        Self {
            structurer: Arc::clone(&model),
            selector: Arc::clone(&model),
            layout: model,
        }
    }

    /// Resolve a provider for each stage from `config` and the environment.
    pub fn from_config(config: &PortfolioConfig) -> Result<Self, FolioError> {
        Ok(Self {
            structurer: resolve_model(config, &config.structurer)?,
            selector: resolve_model(config, &config.selector)?,
            layout: resolve_model(config, &config.layout)?,
        })
    }
}

impl std::fmt::Debug for StageModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageModels")
            .field("structurer", &self.structurer.name())
            .field("selector", &self.selector.name())
            .field("layout", &self.layout.name())
            .finish()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, FolioError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        FolioError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the model for one stage, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with the stage model,
///    else `config.model`, else [`DEFAULT_MODEL`].
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`);
///    a stage or config model still overrides the env model.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, so users holding several
///    keys get a predictable default.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_model(
    config: &PortfolioConfig,
    stage: &StageSettings,
) -> Result<Arc<dyn TextModel>, FolioError> {
    let requested = stage.model.as_deref().or(config.model.as_deref());

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderModel::new(Arc::clone(provider), "custom")));
    }

    if let Some(ref name) = config.provider_name {
        let model = requested.unwrap_or(DEFAULT_MODEL);
        return Ok(Arc::new(ProviderModel::new(
            create_provider(name, model)?,
            format!("{name}/{model}"),
        )));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            let model = requested.unwrap_or(&env_model);
            return Ok(Arc::new(ProviderModel::new(
                create_provider(&prov, model)?,
                format!("{prov}/{model}"),
            )));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = requested.unwrap_or(DEFAULT_MODEL);
            return Ok(Arc::new(ProviderModel::new(
                create_provider("openai", model)?,
                format!("openai/{model}"),
            )));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| FolioError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(ProviderModel::new(llm_provider, "auto")))
}

// ── Retrying call ────────────────────────────────────────────────────────

/// Call `model` with timeout and transient-error retries.
///
/// On success the reply's token usage and any retries are added to
/// `stats`. An empty reply counts as a transient failure.
pub async fn complete_with_retry(
    model: &dyn TextModel,
    request: &CompletionRequest,
    stage: Stage,
    config: &PortfolioConfig,
    stats: &mut StageStats,
) -> Result<Completion, FolioError> {
    let mut last_err = ModelError::Empty;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt - 1));
            warn!(
                "{}: retry {}/{} after {}ms",
                stage, attempt, config.max_retries, backoff
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_retry(stage, attempt + 1, &last_err.to_string());
            }
            sleep(Duration::from_millis(backoff)).await;
            stats.retries += 1;
        }

        let start = Instant::now();
        let result = match timeout(
            Duration::from_secs(config.api_timeout_secs),
            model.complete(request),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(ModelError::Timeout {
                secs: config.api_timeout_secs,
            }),
        };

        match result {
            Ok(completion) if completion.content.trim().is_empty() => {
                warn!("{}: {} returned an empty completion", stage, model.name());
                last_err = ModelError::Empty;
            }
            Ok(completion) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    stage,
                    completion.input_tokens,
                    completion.output_tokens,
                    start.elapsed()
                );
                stats.input_tokens += completion.input_tokens;
                stats.output_tokens += completion.output_tokens;
                return Ok(completion);
            }
            Err(e) if !e.is_retryable() => {
                return Err(FolioError::ModelCallFailed {
                    stage,
                    retries: attempt,
                    source: e,
                });
            }
            Err(e) => {
                warn!("{}: attempt {} failed — {}", stage, attempt + 1, e);
                last_err = e;
            }
        }
    }

    Err(FolioError::ModelCallFailed {
        stage,
        retries: config.max_retries,
        source: last_err,
    })
}
