//! One-shot entry points: upload, generate once, return.
//!
//! These wrap a throwaway [`Session`] for callers that do not need
//! "generate again" or access to intermediate state. Use [`Session`]
//! directly for interactive flows.

use crate::config::PortfolioConfig;
use crate::error::FolioError;
use crate::output::{PortfolioOutput, RunStats};
use crate::pipeline::{extract, input};
use crate::session::Session;
use crate::store::write_atomic;
use std::path::Path;
use tracing::info;

/// Generate a portfolio from a resume PDF path or URL.
///
/// Models are resolved from `config` and the environment (see
/// [`crate::pipeline::llm::StageModels::from_config`]). Artifacts are
/// written under `config.work_dir`.
///
/// # Example
/// ```rust,no_run
/// use resume_folio::{generate_portfolio, PortfolioConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PortfolioConfig::builder().work_dir("site").build()?;
/// let output = generate_portfolio("resume.pdf", &config).await?;
/// println!("theme: {}", output.theme.theme);
/// # Ok(())
/// # }
/// ```
pub async fn generate_portfolio(
    input_str: impl AsRef<str>,
    config: &PortfolioConfig,
) -> Result<PortfolioOutput, FolioError> {
    let input_str = input_str.as_ref();
    info!("Starting portfolio generation: {}", input_str);
    let mut session = Session::from_config(config.clone())?;
    session.upload(input_str);
    session.generate().await
}

/// Generate a portfolio from resume PDF bytes held in memory.
///
/// The bytes are spooled to a managed temp file that is removed on return.
pub async fn generate_portfolio_from_bytes(
    bytes: &[u8],
    config: &PortfolioConfig,
) -> Result<PortfolioOutput, FolioError> {
    let mut session = Session::from_config(config.clone())?;
    session.upload_bytes(bytes);
    session.generate().await
}

/// Generate a portfolio and additionally copy the page to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PortfolioConfig,
) -> Result<RunStats, FolioError> {
    let output = generate_portfolio(input_str, config).await?;
    write_atomic(output_path.as_ref(), output.html.as_bytes()).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`generate_portfolio`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &PortfolioConfig,
) -> Result<PortfolioOutput, FolioError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FolioError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_portfolio(input_str, config))
}

/// Extract a resume's text without calling any model.
///
/// Does not require an LLM provider or API key.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &PortfolioConfig,
) -> Result<String, FolioError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract::extract_text(resolved.path(), config.password.as_deref()).await
}
