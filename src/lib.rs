//! # resume-folio
//!
//! Turn a resume PDF into a generated personal portfolio web page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume.pdf
//!  │
//!  ├─ 1. Input      resolve local file, download URL, or spool bytes
//!  ├─ 2. Extract    page text via pdfium (spawn_blocking)
//!  ├─ 3. Structure  LLM → strict JSON extraction → schema check   → parser.json
//!  ├─ 4. Theme      LLM picks one of eleven themes (fallback: tech)
//!  ├─ 5. Layout     LLM writes a Jinja-style HTML template         → templates/generated_template.html
//!  └─ 6. Render     template + resume data → static page           → index.html
//! ```
//!
//! Stages 3–5 re-ask the model, up to `max_attempts` times, when a reply
//! cannot be used. A layout that references a field the resume lacks is
//! regenerated rather than rendered with holes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_folio::{PortfolioConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = PortfolioConfig::builder().work_dir("site").build()?;
//!     let mut session = Session::from_config(config)?;
//!
//!     session.upload("resume.pdf");
//!     let first = session.generate().await?;
//!     eprintln!("theme: {}", first.theme.theme);
//!
//!     // Not satisfied? Theme and layout are re-rolled; the resume is reused.
//!     let second = session.generate().await?;
//!     println!("{}", second.artifacts.portfolio.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `folio` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-folio = { version = "0.1", default-features = false }
//! ```
//!
//! ## Privacy
//!
//! The resume text and the structured data are sent to whichever model
//! provider is configured. Resumes carry personal data; pick a provider
//! (or a local Ollama model) accordingly.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod resume;
pub mod session;
pub mod store;
pub mod template;
pub mod theme;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PortfolioConfig, PortfolioConfigBuilder, StageSettings, DEFAULT_MODEL};
pub use error::{FolioError, ModelError};
pub use generate::{
    extract_text, generate_portfolio, generate_portfolio_from_bytes, generate_sync,
    generate_to_file,
};
pub use output::{ArtifactPaths, PortfolioOutput, RunStats, StageStats};
pub use pipeline::llm::{Completion, CompletionRequest, ProviderModel, StageModels, TextModel};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use resume::{SchemaViolation, StructuredResume};
pub use session::{Session, SessionState, Stage};
pub use store::ArtifactStore;
pub use template::{Template, TemplateError, UndefinedBehavior};
pub use theme::{Theme, ThemeChoice, UnknownTheme};
