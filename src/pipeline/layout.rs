//! Layout generation: resume data + theme → a persisted HTML template.

use super::llm::{complete_with_retry, CompletionRequest, TextModel};
use super::reply::extract_html_document;
use crate::config::PortfolioConfig;
use crate::error::FolioError;
use crate::output::StageStats;
use crate::prompts::layout_prompt;
use crate::resume::StructuredResume;
use crate::session::Stage;
use crate::store::ArtifactStore;
use crate::template::{Template, TemplateError};
use crate::theme::Theme;
use std::time::Instant;
use tracing::{info, warn};

/// Generate a layout template, persist it, and return its source.
///
/// A reply without an `<html>…</html>` document, or whose document does not
/// parse as a template, is re-requested; at most `budget` completions are
/// made. `feedback` describes why a previous layout was rejected after it
/// was persisted (for example, it failed to render); it is passed to the
/// model on the first attempt. The returned stats' `attempts` is the number
/// of completions used.
pub async fn generate_layout(
    resume: &StructuredResume,
    theme: Theme,
    model: &dyn TextModel,
    config: &PortfolioConfig,
    store: &ArtifactStore,
    budget: u32,
    feedback: Option<&str>,
) -> Result<(String, StageStats), FolioError> {
    let start = Instant::now();
    let mut stats = StageStats::new(Stage::GeneratingLayout);
    let mut rejection: Option<String> = feedback.map(str::to_string);
    let mut last_parse_error: Option<TemplateError> = None;

    for attempt in 1..=budget {
        if attempt > 1 {
            if let (Some(cb), Some(reason)) = (&config.progress_callback, &rejection) {
                cb.on_retry(Stage::GeneratingLayout, attempt, reason);
            }
        }

        let request = CompletionRequest::new(
            layout_prompt(resume, theme, rejection.as_deref()),
            &config.layout,
        );
        let reply =
            complete_with_retry(model, &request, Stage::GeneratingLayout, config, &mut stats).await?;
        stats.attempts = attempt;

        let Some(document) = extract_html_document(&reply.content) else {
            warn!(
                "Layout attempt {}/{}: no <html> document in {} byte reply",
                attempt,
                budget,
                reply.content.len()
            );
            rejection = Some("it did not contain a complete <html>…</html> document".into());
            last_parse_error = None;
            continue;
        };

        if let Err(e) = Template::parse(&document) {
            warn!(
                "Layout attempt {}/{}: template does not parse: {}",
                attempt, budget, e
            );
            rejection = Some(e.to_string());
            last_parse_error = Some(e);
            continue;
        }

        store.save_layout(&document).await?;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Generated {} byte layout for theme '{}' (attempt {})",
            document.len(),
            theme,
            attempt
        );
        return Ok((document, stats));
    }

    Err(match last_parse_error {
        Some(source) => FolioError::LayoutInvalid {
            attempts: budget,
            source,
        },
        None => FolioError::LayoutNotFound { attempts: budget },
    })
}
