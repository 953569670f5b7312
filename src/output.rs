//! Result types returned by a finished run.

use crate::resume::StructuredResume;
use crate::session::Stage;
use crate::theme::ThemeChoice;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-stage accounting for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: Stage,
    /// Model calls that returned a reply (transport retries excluded).
    pub attempts: u32,
    /// Transport retries spent across all attempts.
    pub retries: u32,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

impl StageStats {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            attempts: 0,
            retries: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
        }
    }
}

/// Aggregate statistics for one `generate` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub stages: Vec<StageStats>,
    /// True when the structured resume came from an earlier run.
    pub reused_resume: bool,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    /// Record a finished stage, folding its tokens into the totals.
    pub fn push(&mut self, stats: StageStats) {
        self.total_input_tokens += stats.input_tokens as u64;
        self.total_output_tokens += stats.output_tokens as u64;
        self.stages.push(stats);
    }

    /// Statistics for `stage`, if it ran.
    pub fn stage(&self, stage: Stage) -> Option<&StageStats> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Where a run's artifacts were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub resume: PathBuf,
    pub layout: PathBuf,
    pub portfolio: PathBuf,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOutput {
    /// The rendered page.
    pub html: String,
    pub resume: StructuredResume,
    pub theme: ThemeChoice,
    /// The layout template the page was rendered from.
    pub layout: String,
    pub artifacts: ArtifactPaths,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_tokens() {
        let mut run = RunStats::default();
        run.push(StageStats {
            input_tokens: 100,
            output_tokens: 40,
            ..StageStats::new(Stage::Structuring)
        });
        run.push(StageStats {
            input_tokens: 50,
            output_tokens: 2,
            ..StageStats::new(Stage::SelectingTheme)
        });
        assert_eq!(run.total_input_tokens, 150);
        assert_eq!(run.total_output_tokens, 42);
        assert_eq!(run.stage(Stage::SelectingTheme).map(|s| s.output_tokens), Some(2));
        assert!(run.stage(Stage::Rendering).is_none());
    }

    #[test]
    fn stats_serialise_with_stage_names() {
        let json = serde_json::to_string(&StageStats::new(Stage::GeneratingLayout)).unwrap();
        assert!(json.contains("\"stage\":\"generating_layout\""), "got {json}");
    }
}
