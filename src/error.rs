//! Error types for the resume-folio library.
//!
//! Three error types reflect three layers of the pipeline:
//!
//! * [`FolioError`] — **Fatal** for the current run: the portfolio cannot be
//!   produced (bad input file, provider not configured, the model never
//!   returned a usable answer). Returned from every top-level entry point
//!   and from [`crate::session::Session::generate`].
//!
//! * [`ModelError`] — a single remote completion failed. Transient variants
//!   are retried by [`crate::pipeline::llm`] before they are promoted to a
//!   [`FolioError`].
//!
//! * [`crate::template::TemplateError`] — the layout template could not be
//!   parsed or rendered. Wrapped by [`FolioError::Template`].

use crate::session::Stage;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume-folio library.
#[derive(Debug, Error)]
pub enum FolioError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Resume file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened but no page carried extractable text (scanned image, empty file).
    #[error("No text could be extracted from '{path}' ({pages} pages)\nScanned resumes need OCR first.")]
    EmptyDocument { path: PathBuf, pages: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs a pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A completion failed after all transport retries.
    #[error("{stage} model call failed after {retries} retries: {source}")]
    ModelCallFailed {
        stage: Stage,
        retries: u32,
        #[source]
        source: ModelError,
    },

    // ── Pipeline output errors ───────────────────────────────────────────
    /// The structurer never produced a JSON object that passed validation.
    #[error("Could not structure the resume after {attempts} attempts: {detail}")]
    StructuringFailed { attempts: u32, detail: String },

    /// The layout model never produced an `<html>…</html>` document.
    #[error("No HTML document found in the layout reply after {attempts} attempts")]
    LayoutNotFound { attempts: u32 },

    /// The layout model produced documents, but none rendered against the resume data.
    #[error("Generated layout is unusable after {attempts} attempts: {source}")]
    LayoutInvalid {
        attempts: u32,
        #[source]
        source: TemplateError,
    },

    /// `generate` was called before any resume was uploaded.
    #[error("No resume uploaded; upload a PDF before generating")]
    NoUpload,

    /// A stage needs an artifact an earlier stage did not produce.
    #[error("Missing {artifact}: the {stage} stage cannot run")]
    MissingArtifact { stage: Stage, artifact: &'static str },

    // ── Template errors ──────────────────────────────────────────────────
    /// The persisted layout failed to parse or render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an artifact file.
    #[error("Failed to write '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read a persisted artifact back.
    #[error("Failed to read '{path}': {source}")]
    ArtifactReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed remote completion.
///
/// Only [`ModelError::Auth`] is permanent; everything else is worth another
/// attempt after a back-off.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Provider returned HTTP 429.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The call did not finish within `api_timeout_secs`.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Authentication failed (401/403). Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider answered with an empty completion.
    #[error("empty completion")]
    Empty,

    /// Any other provider failure.
    #[error("{0}")]
    Api(String),
}

impl ModelError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ModelError::Auth(_))
    }
}
