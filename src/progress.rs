//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PortfolioConfigBuilder::progress_callback`] to receive
//! events as a [`crate::session::Session`] moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use resume_folio::{PipelineProgressCallback, PortfolioConfig, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = PortfolioConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::session::Stage;
use std::sync::Arc;

/// Called by the session as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. A session runs its stages in sequence, so events
/// for one session never arrive concurrently.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once when `generate` begins.
    ///
    /// # Arguments
    /// * `reused_resume` — true when the structured resume from an earlier
    ///   run is reused and extraction/structuring are skipped
    fn on_run_start(&self, reused_resume: bool) {
        let _ = reused_resume;
    }

    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// # Arguments
    /// * `stage`       — the stage that finished
    /// * `duration_ms` — wall-clock time spent in the stage
    fn on_stage_complete(&self, stage: Stage, duration_ms: u64) {
        let _ = (stage, duration_ms);
    }

    /// Called when a stage gives up and the run aborts.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called before a stage retries, either after a transient model error or
    /// after a reply that could not be used.
    ///
    /// # Arguments
    /// * `stage`   — the stage retrying
    /// * `attempt` — 1-indexed number of the attempt about to start
    /// * `reason`  — why the previous attempt failed
    fn on_retry(&self, stage: Stage, attempt: u32, reason: &str) {
        let _ = (stage, attempt, reason);
    }

    /// Called once after the portfolio has been rendered and saved.
    ///
    /// # Arguments
    /// * `html_len` — byte length of the rendered page
    fn on_run_complete(&self, html_len: usize) {
        let _ = html_len;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PortfolioConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_retry(&self, stage: Stage, attempt: u32, _reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("retry {stage} #{attempt}"));
        }

        fn on_stage_complete(&self, stage: Stage, _duration_ms: u64) {
            self.events.lock().unwrap().push(format!("done {stage}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(false);
        cb.on_stage_start(Stage::Extracting);
        cb.on_retry(Stage::Structuring, 2, "malformed JSON");
        cb.on_stage_complete(Stage::Extracting, 12);
        cb.on_stage_error(Stage::GeneratingLayout, "no document");
        cb.on_run_complete(1024);
    }

    #[test]
    fn overridden_methods_receive_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Structuring);
        rec.on_retry(Stage::Structuring, 2, "no JSON object in reply");
        rec.on_stage_complete(Stage::Structuring, 5);
        rec.on_run_complete(10);

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "start structuring",
                "retry structuring #2",
                "done structuring"
            ]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Rendering);
    }
}
