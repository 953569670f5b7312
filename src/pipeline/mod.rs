//! Pipeline stages for resume-to-portfolio generation.
//!
//! Each submodule implements exactly one transformation step; the
//! [`crate::session::Session`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ structure ──▶ theme_select ──▶ layout ──▶ render
//! (path/URL)  (pdfium)    (LLM+JSON)     (LLM+catalog)    (LLM+HTML)  (template)
//! ```
//!
//! 1. [`input`]   — canonicalise the uploaded path, URL or bytes to a local file
//! 2. [`extract`] — page text via pdfium, in `spawn_blocking`
//! 3. [`structure`] — text → validated resume JSON, re-asking on bad replies
//! 4. [`theme_select`] — resume → one catalog theme, falling back to `tech`
//! 5. [`layout`]  — resume + theme → persisted HTML template
//! 6. [`render`]  — persisted template + resume → final page
//!
//! [`llm`] holds the model seam and retry logic shared by stages 3–5, and
//! [`reply`] the cleanup and strict extraction applied to their replies.

pub mod extract;
pub mod input;
pub mod layout;
pub mod llm;
pub mod render;
pub mod reply;
pub mod structure;
pub mod theme_select;
