//! Text extraction from a PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks for the whole parse. `tokio::task::spawn_blocking` moves
//! the work onto the blocking pool so Tokio worker threads never stall.
//!
//! ## Locating pdfium
//!
//! 1. `PDFIUM_LIB_PATH`: a library file, or a directory containing one.
//! 2. The platform library name in the current directory.
//! 3. The system library search path.

use crate::error::FolioError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extract the text of every page, concatenated in document order.
///
/// Fails with [`FolioError::EmptyDocument`] when no page carries text, so a
/// scanned image never reaches the structurer.
pub async fn extract_text(pdf_path: &Path, password: Option<&str>) -> Result<String, FolioError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_text_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| FolioError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(pdf_path: &Path, password: Option<&str>) -> Result<String, FolioError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password, format!("{:?}", e)))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let mut text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page_text = page
            .text()
            .map_err(|e| FolioError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, page_text.chars().count());
        text.push_str(&page_text);
    }

    if text.trim().is_empty() {
        return Err(FolioError::EmptyDocument {
            path: pdf_path.to_path_buf(),
            pages: page_count,
        });
    }

    Ok(text)
}

fn bind_pdfium() -> Result<Pdfium, FolioError> {
    let lib_name = Pdfium::pdfium_platform_library_name();

    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let mut path = PathBuf::from(p);
            if path.is_dir() {
                path = path.join(&lib_name);
            }
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_library(Path::new(".").join(&lib_name))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| FolioError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Map a pdfium load failure onto the input error it most likely means.
fn classify_load_error(path: &Path, password: Option<&str>, detail: String) -> FolioError {
    if detail.to_lowercase().contains("password") {
        if password.is_some() {
            FolioError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            FolioError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        FolioError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_distinguished() {
        let p = Path::new("cv.pdf");
        assert!(matches!(
            classify_load_error(p, None, "PdfiumLibraryInternalError(PasswordError)".into()),
            FolioError::PasswordRequired { .. }
        ));
        assert!(matches!(
            classify_load_error(p, Some("x"), "PasswordError".into()),
            FolioError::WrongPassword { .. }
        ));
        assert!(matches!(
            classify_load_error(p, None, "FormatError".into()),
            FolioError::CorruptPdf { .. }
        ));
    }
}
