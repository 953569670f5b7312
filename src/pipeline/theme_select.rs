//! Theme selection: pick one label from the closed catalog.

use super::llm::{complete_with_retry, CompletionRequest, TextModel};
use crate::config::PortfolioConfig;
use crate::error::FolioError;
use crate::output::StageStats;
use crate::prompts::theme_prompt;
use crate::resume::StructuredResume;
use crate::session::Stage;
use crate::theme::ThemeChoice;
use std::time::Instant;
use tracing::{info, warn};

/// Choose a theme for `resume`.
///
/// A theme forced by configuration skips the model call. Otherwise one
/// reply is requested; a reply outside the catalog falls back to the
/// default theme and is flagged on the returned [`ThemeChoice`].
pub async fn select_theme(
    resume: &StructuredResume,
    model: &dyn TextModel,
    config: &PortfolioConfig,
) -> Result<(ThemeChoice, StageStats), FolioError> {
    let start = Instant::now();
    let mut stats = StageStats::new(Stage::SelectingTheme);

    if let Some(theme) = config.forced_theme {
        info!("Theme forced by configuration: {}", theme);
        return Ok((ThemeChoice::forced(theme), stats));
    }

    let request = CompletionRequest::new(theme_prompt(resume), &config.selector);
    let reply = complete_with_retry(model, &request, Stage::SelectingTheme, config, &mut stats).await?;
    stats.attempts = 1;
    stats.duration_ms = start.elapsed().as_millis() as u64;

    let choice = ThemeChoice::from_reply(&reply.content);
    if choice.fell_back {
        warn!(
            "Selector reply {:?} is not a known theme; using '{}'",
            reply.content.trim(),
            choice.theme
        );
    } else {
        info!("Selected theme: {}", choice.theme);
    }
    Ok((choice, stats))
}
