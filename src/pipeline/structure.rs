//! Structuring: free resume text → validated [`StructuredResume`].

use super::llm::{complete_with_retry, CompletionRequest, TextModel};
use super::reply::extract_json_object;
use crate::config::PortfolioConfig;
use crate::error::FolioError;
use crate::output::StageStats;
use crate::prompts::structure_prompt;
use crate::resume::StructuredResume;
use crate::session::Stage;
use std::time::Instant;
use tracing::{info, warn};

/// Ask the model to structure `text`, re-asking up to `max_attempts` times
/// while the reply carries no valid JSON object or fails the schema.
pub async fn structure_resume(
    text: &str,
    model: &dyn TextModel,
    config: &PortfolioConfig,
) -> Result<(StructuredResume, StageStats), FolioError> {
    let start = Instant::now();
    let mut stats = StageStats::new(Stage::Structuring);
    let mut rejection: Option<String> = None;

    for attempt in 1..=config.max_attempts {
        if let Some(ref reason) = rejection {
            if let Some(ref cb) = config.progress_callback {
                cb.on_retry(Stage::Structuring, attempt, reason);
            }
        }

        let request = CompletionRequest::new(
            structure_prompt(text, rejection.as_deref()),
            &config.structurer,
        );
        let reply = complete_with_retry(model, &request, Stage::Structuring, config, &mut stats).await?;
        stats.attempts = attempt;

        let parsed = extract_json_object(&reply.content)
            .map_err(|e| e.to_string())
            .and_then(|map| StructuredResume::from_map(map).map_err(|e| format!("schema violation: {e}")));

        match parsed {
            Ok(resume) => {
                stats.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Structured resume: {} top-level fields (attempt {})",
                    resume.fields().len(),
                    attempt
                );
                return Ok((resume, stats));
            }
            Err(reason) => {
                warn!(
                    "Structuring attempt {}/{} rejected: {}",
                    attempt, config.max_attempts, reason
                );
                rejection = Some(reason);
            }
        }
    }

    Err(FolioError::StructuringFailed {
        attempts: config.max_attempts,
        detail: rejection.unwrap_or_default(),
    })
}
