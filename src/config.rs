//! Configuration types for resume-to-portfolio generation.
//!
//! All pipeline behaviour is controlled through [`PortfolioConfig`], built
//! via its [`PortfolioConfigBuilder`]. Each of the three model calls has its
//! own [`StageSettings`] because they want very different sampling: the
//! structurer must be faithful, the selector and layout generator are meant
//! to vary between runs.

use crate::error::FolioError;
use crate::progress::ProgressCallback;
use crate::template::UndefinedBehavior;
use crate::theme::Theme;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the caller nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Upper bound accepted for [`PortfolioConfig::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Sampling settings for one model-backed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    /// Model identifier for this stage. `None` uses [`PortfolioConfig::model`].
    pub model: Option<String>,

    /// Sampling temperature. Range: 0.0–2.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate for this stage.
    pub max_tokens: usize,
}

impl StageSettings {
    fn new(temperature: f32, max_tokens: usize) -> Self {
        Self {
            model: None,
            temperature,
            max_tokens,
        }
    }

    /// Structurer defaults: low randomness. Temperature 0.3, 4096 tokens.
    pub fn structurer() -> Self {
        Self::new(0.3, 4096)
    }

    /// Theme selector defaults: full randomness so "generate again" can
    /// land on a different theme. Temperature 1.0, 256 tokens.
    pub fn selector() -> Self {
        Self::new(1.0, 256)
    }

    /// Layout generator defaults. Temperature 0.8, 16384 tokens.
    ///
    /// A complete page with inline CSS and JavaScript easily passes 6 000
    /// output tokens; a reply cut off before `</html>` is unusable.
    pub fn layout() -> Self {
        Self::new(0.8, 16384)
    }
}

/// Configuration for a portfolio session.
///
/// Built via [`PortfolioConfig::builder()`] or using
/// [`PortfolioConfig::default()`].
///
/// # Example
/// ```rust
/// use resume_folio::{PortfolioConfig, Theme};
///
/// let config = PortfolioConfig::builder()
///     .model("gpt-4.1-mini")
///     .work_dir("out")
///     .theme(Theme::Elegant)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PortfolioConfig {
    /// Default model for every stage, e.g. "gpt-4.1-mini", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`] or the environment's choice.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and over per-stage model names.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Settings for the structuring call.
    pub structurer: StageSettings,

    /// Settings for the theme-selection call.
    pub selector: StageSettings,

    /// Settings for the layout-generation call.
    pub layout: StageSettings,

    /// Maximum retry attempts on a transient model API failure. Default: 3.
    /// At most [`MAX_RETRIES_LIMIT`].
    ///
    /// Authentication failures are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// How many completions a stage may request to get a reply it can use
    /// (no JSON object, schema violation, no HTML document, unrenderable
    /// template). Default: 3. Minimum: 1.
    ///
    /// Layout generation and the renders that check its output share one
    /// budget, so a run makes at most `max_attempts` layout completions.
    /// Each completion may itself be retried `max_retries` times on
    /// transient API failures.
    pub max_attempts: u32,

    /// Per-model-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted resumes.
    pub password: Option<String>,

    /// Directory holding `parser.json`, `templates/generated_template.html`
    /// and `index.html`. Default: the current directory.
    pub work_dir: PathBuf,

    /// Skip the theme-selection call and use this theme.
    pub forced_theme: Option<Theme>,

    /// Fail rendering when a placeholder names a missing field. Default: true.
    ///
    /// With strict mode on, a layout that references fields the resume does
    /// not have is regenerated instead of producing a page with holes.
    pub strict_undefined: bool,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            structurer: StageSettings::structurer(),
            selector: StageSettings::selector(),
            layout: StageSettings::layout(),
            max_retries: 3,
            retry_backoff_ms: 500,
            max_attempts: 3,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            work_dir: PathBuf::from("."),
            forced_theme: None,
            strict_undefined: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PortfolioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortfolioConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("structurer", &self.structurer)
            .field("selector", &self.selector)
            .field("layout", &self.layout)
            .field("max_retries", &self.max_retries)
            .field("max_attempts", &self.max_attempts)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("work_dir", &self.work_dir)
            .field("forced_theme", &self.forced_theme)
            .field("strict_undefined", &self.strict_undefined)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PortfolioConfig {
    /// Create a new builder for `PortfolioConfig`.
    pub fn builder() -> PortfolioConfigBuilder {
        PortfolioConfigBuilder {
            config: Self::default(),
        }
    }

    /// How the renderer treats placeholders naming missing fields.
    pub fn undefined_behavior(&self) -> UndefinedBehavior {
        if self.strict_undefined {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        }
    }
}

/// Builder for [`PortfolioConfig`].
#[derive(Debug)]
pub struct PortfolioConfigBuilder {
    config: PortfolioConfig,
}

impl PortfolioConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn structure_model(mut self, model: impl Into<String>) -> Self {
        self.config.structurer.model = Some(model.into());
        self
    }

    pub fn theme_model(mut self, model: impl Into<String>) -> Self {
        self.config.selector.model = Some(model.into());
        self
    }

    pub fn layout_model(mut self, model: impl Into<String>) -> Self {
        self.config.layout.model = Some(model.into());
        self
    }

    pub fn structurer(mut self, settings: StageSettings) -> Self {
        self.config.structurer = settings;
        self
    }

    pub fn selector(mut self, settings: StageSettings) -> Self {
        self.config.selector = settings;
        self
    }

    pub fn layout(mut self, settings: StageSettings) -> Self {
        self.config.layout = settings;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.forced_theme = Some(theme);
        self
    }

    pub fn strict_undefined(mut self, v: bool) -> Self {
        self.config.strict_undefined = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PortfolioConfig, FolioError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(FolioError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(FolioError::InvalidConfig(format!(
                "max_retries must be ≤ {MAX_RETRIES_LIMIT}, got {}",
                c.max_retries
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(FolioError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        for (name, stage) in [
            ("structurer", &c.structurer),
            ("selector", &c.selector),
            ("layout", &c.layout),
        ] {
            if !(0.0..=2.0).contains(&stage.temperature) {
                return Err(FolioError::InvalidConfig(format!(
                    "{name} temperature must be 0.0–2.0, got {}",
                    stage.temperature
                )));
            }
            if stage.max_tokens == 0 {
                return Err(FolioError::InvalidConfig(format!(
                    "{name} max_tokens must be ≥ 1"
                )));
            }
        }
        if c.work_dir.as_os_str().is_empty() {
            return Err(FolioError::InvalidConfig("work_dir must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stage_temperatures() {
        let c = PortfolioConfig::default();
        assert_eq!(c.structurer.temperature, 0.3);
        assert_eq!(c.selector.temperature, 1.0);
        assert_eq!(c.layout.temperature, 0.8);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.max_attempts, 3);
        assert!(c.strict_undefined);
        assert_eq!(c.undefined_behavior(), UndefinedBehavior::Strict);
    }

    #[test]
    fn builder_sets_per_stage_models() {
        let c = PortfolioConfig::builder()
            .model("base")
            .layout_model("big")
            .theme(Theme::Classic)
            .strict_undefined(false)
            .build()
            .unwrap();
        assert_eq!(c.model.as_deref(), Some("base"));
        assert_eq!(c.layout.model.as_deref(), Some("big"));
        assert_eq!(c.structurer.model, None);
        assert_eq!(c.forced_theme, Some(Theme::Classic));
        assert_eq!(c.undefined_behavior(), UndefinedBehavior::Lenient);
    }

    #[test]
    fn excessive_retries_rejected() {
        let err = PortfolioConfig::builder().max_retries(65).build().unwrap_err();
        assert!(err.to_string().contains("max_retries"));
        assert!(PortfolioConfig::builder()
            .max_retries(MAX_RETRIES_LIMIT)
            .build()
            .is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = PortfolioConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(matches!(err, FolioError::InvalidConfig(_)));
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let err = PortfolioConfig::builder()
            .selector(StageSettings {
                model: None,
                temperature: 3.5,
                max_tokens: 10,
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("selector temperature"));
    }

    #[test]
    fn debug_hides_provider_and_callback() {
        let c = PortfolioConfig::builder()
            .progress_callback(Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn PipelineProgressCallback>"));
    }
}
