//! The per-session controller that sequences the pipeline stages.
//!
//! A [`Session`] owns everything one user's run needs: configuration, the
//! stage models, the artifact store and the five pieces of session state
//! (resume, theme, layout, portfolio, saved flag). Nothing is global, so
//! two sessions with different work dirs never observe each other.
//!
//! ```text
//!           upload / reset
//!                 │
//!  Idle ──▶ Extracting ──▶ Structuring ──▶ SelectingTheme ──▶ GeneratingLayout ──▶ Rendering ──▶ Ready
//!                                               ▲                     ▲                │
//!                                               │                     └── undefined ───┘
//!                                               └──────── generate again ◀──────────────┘
//! ```
//!
//! Any stage error moves the session to [`SessionState::Failed`].

use crate::config::PortfolioConfig;
use crate::error::FolioError;
use crate::output::{PortfolioOutput, RunStats, StageStats};
use crate::pipeline::llm::StageModels;
use crate::pipeline::{extract, input, layout, render, structure, theme_select};
use crate::resume::StructuredResume;
use crate::store::ArtifactStore;
use crate::theme::ThemeChoice;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// A working stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Structuring,
    SelectingTheme,
    GeneratingLayout,
    Rendering,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Extracting,
        Stage::Structuring,
        Stage::SelectingTheme,
        Stage::GeneratingLayout,
        Stage::Rendering,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extracting => "extraction",
            Stage::Structuring => "structuring",
            Stage::SelectingTheme => "theme selection",
            Stage::GeneratingLayout => "layout generation",
            Stage::Rendering => "rendering",
        })
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running(Stage),
    Ready,
    Failed { stage: Stage, message: String },
}

/// What the user uploaded.
#[derive(Debug, Clone)]
enum Upload {
    /// Local path or HTTP(S) URL of a PDF.
    Location(String),
    /// PDF bytes.
    Bytes(Vec<u8>),
    /// Already-extracted resume text.
    Text(String),
}

/// One user's portfolio session.
pub struct Session {
    config: PortfolioConfig,
    models: StageModels,
    store: ArtifactStore,
    upload: Option<Upload>,
    state: SessionState,
    resume: Option<StructuredResume>,
    theme: Option<ThemeChoice>,
    layout: Option<String>,
    portfolio: Option<String>,
    saved: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("work_dir", &self.store.root())
            .field("models", &self.models)
            .field("state", &self.state)
            .field("has_upload", &self.upload.is_some())
            .field("theme", &self.theme.as_ref().map(|c| c.theme))
            .field("saved", &self.saved)
            .finish()
    }
}

impl Session {
    /// An idle session writing artifacts under `config.work_dir`.
    pub fn new(config: PortfolioConfig, models: StageModels) -> Self {
        let store = ArtifactStore::new(config.work_dir.clone());
        Self {
            config,
            models,
            store,
            upload: None,
            state: SessionState::Idle,
            resume: None,
            theme: None,
            layout: None,
            portfolio: None,
            saved: false,
        }
    }

    /// An idle session whose models are resolved from `config` and the
    /// environment.
    pub fn from_config(config: PortfolioConfig) -> Result<Self, FolioError> {
        let models = StageModels::from_config(&config)?;
        Ok(Self::new(config, models))
    }

    // ── Uploads ──────────────────────────────────────────────────────────

    /// Upload a PDF by local path or HTTP(S) URL. Clears all session state.
    pub fn upload(&mut self, input: impl Into<String>) {
        self.reset();
        self.upload = Some(Upload::Location(input.into()));
    }

    /// Upload PDF bytes. Clears all session state.
    pub fn upload_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.reset();
        self.upload = Some(Upload::Bytes(bytes.into()));
    }

    /// Upload resume text that was extracted elsewhere. Clears all session state.
    pub fn upload_text(&mut self, text: impl Into<String>) {
        self.reset();
        self.upload = Some(Upload::Text(text.into()));
    }

    /// Clear the resume, theme, layout, portfolio and saved flag.
    ///
    /// The upload is kept, so the next `generate` starts again from extraction.
    pub fn reset(&mut self) {
        self.resume = None;
        self.theme = None;
        self.layout = None;
        self.portfolio = None;
        self.saved = false;
        self.state = SessionState::Idle;
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn has_upload(&self) -> bool {
        self.upload.is_some()
    }

    pub fn resume(&self) -> Option<&StructuredResume> {
        self.resume.as_ref()
    }

    pub fn theme(&self) -> Option<&ThemeChoice> {
        self.theme.as_ref()
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn portfolio(&self) -> Option<&str> {
        self.portfolio.as_deref()
    }

    /// True once the rendered page has been written to `index.html`.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    // ── Generation ───────────────────────────────────────────────────────

    /// Run the pipeline for the current upload.
    ///
    /// The structured resume from an earlier successful structuring is
    /// reused, so calling `generate` again re-rolls only the theme and the
    /// layout. On error the session moves to [`SessionState::Failed`] and
    /// keeps whatever earlier stages of this run produced.
    pub async fn generate(&mut self) -> Result<PortfolioOutput, FolioError> {
        if self.upload.is_none() {
            return Err(FolioError::NoUpload);
        }

        let run_start = Instant::now();
        let mut stats = RunStats {
            reused_resume: self.resume.is_some(),
            ..RunStats::default()
        };
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(stats.reused_resume);
        }

        self.theme = None;
        self.layout = None;
        self.portfolio = None;
        self.saved = false;

        match self.run(&mut stats).await {
            Ok(mut output) => {
                stats.total_duration_ms = run_start.elapsed().as_millis() as u64;
                output.stats = stats;
                self.state = SessionState::Ready;
                info!(
                    "Portfolio ready: {} bytes, theme '{}', {}ms",
                    output.html.len(),
                    output.theme.theme,
                    output.stats.total_duration_ms
                );
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_run_complete(output.html.len());
                }
                Ok(output)
            }
            Err(e) => {
                let stage = match self.state {
                    SessionState::Running(stage) => stage,
                    _ => Stage::Extracting,
                };
                warn!("{} failed: {}", stage, e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_error(stage, &e.to_string());
                }
                self.state = SessionState::Failed {
                    stage,
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        info!("Stage: {}", stage);
        self.state = SessionState::Running(stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    fn finish(&self, stage: Stage, duration_ms: u64) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(stage, duration_ms);
        }
    }

    async fn run(&mut self, stats: &mut RunStats) -> Result<PortfolioOutput, FolioError> {
        let resume = match self.resume.clone() {
            Some(resume) => {
                info!("Reusing structured resume from the previous run");
                resume
            }
            None => {
                let text = self.extract(stats).await?;

                self.enter(Stage::Structuring);
                let (resume, st) =
                    structure::structure_resume(&text, self.models.structurer.as_ref(), &self.config)
                        .await?;
                self.store.save_resume(&resume).await?;
                self.resume = Some(resume.clone());
                self.finish(Stage::Structuring, st.duration_ms);
                stats.push(st);
                resume
            }
        };

        self.enter(Stage::SelectingTheme);
        let (choice, st) =
            theme_select::select_theme(&resume, self.models.selector.as_ref(), &self.config).await?;
        self.theme = Some(choice.clone());
        self.finish(Stage::SelectingTheme, st.duration_ms);
        stats.push(st);

        let (layout, html) = self.layout_and_render(&resume, &choice, stats).await?;

        let portfolio_path = self.store.save_portfolio(&html).await?;
        self.portfolio = Some(html.clone());
        self.saved = true;
        info!("Saved portfolio to {}", portfolio_path.display());

        Ok(PortfolioOutput {
            html,
            resume,
            theme: choice,
            layout,
            artifacts: self.store.paths(),
            stats: RunStats::default(),
        })
    }

    async fn extract(&mut self, stats: &mut RunStats) -> Result<String, FolioError> {
        self.enter(Stage::Extracting);
        let start = Instant::now();

        let text = match self.upload.clone() {
            Some(Upload::Location(location)) => {
                let resolved =
                    input::resolve_input(&location, self.config.download_timeout_secs).await?;
                extract::extract_text(resolved.path(), self.config.password.as_deref()).await?
            }
            Some(Upload::Bytes(bytes)) => {
                let resolved = input::spool_bytes(&bytes)?;
                extract::extract_text(resolved.path(), self.config.password.as_deref()).await?
            }
            Some(Upload::Text(text)) => {
                if text.trim().is_empty() {
                    return Err(FolioError::EmptyDocument {
                        path: PathBuf::from("<text upload>"),
                        pages: 0,
                    });
                }
                text
            }
            None => return Err(FolioError::NoUpload),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Extracted {} characters", text.chars().count());
        self.finish(Stage::Extracting, duration_ms);
        stats.push(StageStats {
            duration_ms,
            ..StageStats::new(Stage::Extracting)
        });
        Ok(text)
    }

    /// Generate and render layouts until one renders against the resume.
    ///
    /// A layout that parses but fails to render (a field the resume lacks,
    /// an unknown filter, a type error) is regenerated with the failure as
    /// feedback. Layout completions across all rounds share one budget of
    /// `max_attempts`.
    async fn layout_and_render(
        &mut self,
        resume: &StructuredResume,
        choice: &ThemeChoice,
        stats: &mut RunStats,
    ) -> Result<(String, String), FolioError> {
        let budget = self.config.max_attempts;
        let mut used = 0;
        let mut round = 0;
        let mut layout_stats = StageStats::new(Stage::GeneratingLayout);
        let mut render_stats = StageStats::new(Stage::Rendering);
        let mut feedback: Option<String> = None;

        while used < budget {
            round += 1;
            self.enter(Stage::GeneratingLayout);
            let generated = layout::generate_layout(
                resume,
                choice.theme,
                self.models.layout.as_ref(),
                &self.config,
                &self.store,
                budget - used,
                feedback.as_deref(),
            )
            .await;
            let (layout, st) = match generated {
                Ok(generated) => generated,
                Err(FolioError::LayoutNotFound { .. }) => {
                    return Err(FolioError::LayoutNotFound { attempts: budget })
                }
                Err(FolioError::LayoutInvalid { source, .. }) => {
                    return Err(FolioError::LayoutInvalid {
                        attempts: budget,
                        source,
                    })
                }
                Err(e) => return Err(e),
            };
            used += st.attempts;
            layout_stats.attempts += st.attempts;
            layout_stats.retries += st.retries;
            layout_stats.input_tokens += st.input_tokens;
            layout_stats.output_tokens += st.output_tokens;
            layout_stats.duration_ms += st.duration_ms;
            self.layout = Some(layout.clone());
            self.finish(Stage::GeneratingLayout, st.duration_ms);

            self.enter(Stage::Rendering);
            let start = Instant::now();
            let rendered =
                render::render_portfolio(&self.store, resume, self.config.undefined_behavior()).await;
            render_stats.attempts = round;
            render_stats.duration_ms += start.elapsed().as_millis() as u64;

            match rendered {
                Ok(html) => {
                    self.finish(Stage::Rendering, render_stats.duration_ms);
                    stats.push(layout_stats);
                    stats.push(render_stats);
                    return Ok((layout, html));
                }
                Err(FolioError::Template(source)) if used < budget => {
                    warn!(
                        "Layout {}/{} does not render: {}; regenerating",
                        used, budget, source
                    );
                    let reason = format!(
                        "rendering failed with {source}; reference only fields present in the resume data"
                    );
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_retry(Stage::GeneratingLayout, used + 1, &reason);
                    }
                    feedback = Some(reason);
                }
                Err(FolioError::Template(source)) => {
                    return Err(FolioError::LayoutInvalid {
                        attempts: used,
                        source,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Err(FolioError::Internal(
            "layout loop ended without a result".into(),
        ))
    }
}
