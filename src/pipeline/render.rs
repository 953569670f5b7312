//! Rendering: persisted layout + resume data → final HTML.
//!
//! The template is always read back from the artifact store rather than
//! taken from memory, so the page on disk is exactly what the persisted
//! layout produces. A missing layout file is an error; nothing is rendered
//! from a template that was never saved.

use crate::error::FolioError;
use crate::resume::StructuredResume;
use crate::session::Stage;
use crate::store::ArtifactStore;
use crate::template::{Template, UndefinedBehavior};
use tracing::debug;

/// Render the active layout with `resume`'s top-level fields as scope.
pub async fn render_portfolio(
    store: &ArtifactStore,
    resume: &StructuredResume,
    undefined: UndefinedBehavior,
) -> Result<String, FolioError> {
    let source = match store.load_layout().await {
        Err(FolioError::ArtifactReadFailed { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            return Err(FolioError::MissingArtifact {
                stage: Stage::Rendering,
                artifact: "layout document",
            });
        }
        other => other?,
    };
    let template = Template::parse(&source)?;
    let html = template.render(resume.fields(), undefined)?;
    debug!(
        "Rendered {} byte template into {} bytes",
        source.len(),
        html.len()
    );
    Ok(html)
}
