//! Input resolution: normalise an uploaded path, URL or byte buffer to a
//! local PDF file.
//!
//! pdfium opens documents from the file system, so URL downloads and
//! in-memory uploads are spooled to temporary files. The temp file lives
//! inside [`ResolvedInput`] and is removed when it is dropped. The PDF magic
//! bytes (`%PDF`) are checked before returning so callers get a meaningful
//! error rather than a pdfium failure.

use crate::error::FolioError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: a local path, a downloaded file or a spooled buffer.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF was downloaded to a temp directory that is
    /// kept alive until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was an in-memory buffer written to a temp file.
    Spooled(NamedTempFile),
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Spooled(file) => file.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, FolioError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || (trimmed.contains("://") && !is_url(trimmed)) {
        return Err(FolioError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(trimmed) {
        download_url(trimmed, timeout_secs).await
    } else {
        resolve_local(trimmed)
    }
}

/// Write an uploaded buffer to a managed temp file.
pub fn spool_bytes(bytes: &[u8]) -> Result<ResolvedInput, FolioError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| FolioError::Internal(format!("tempfile: {e}")))?;

    check_magic(tmp.path(), bytes)?;

    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| FolioError::Internal(format!("tempfile write: {e}")))?;

    debug!("Spooled {} byte upload to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Spooled(tmp))
}

fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), FolioError> {
    if bytes.len() < 4 || &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(FolioError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, FolioError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(FolioError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut head = Vec::with_capacity(4);
            (&mut f)
                .take(4)
                .read_to_end(&mut head)
                .map_err(|e| FolioError::Internal(format!("reading {}: {e}", path.display())))?;
            check_magic(&path, &head)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FolioError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(FolioError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, FolioError> {
    info!("Downloading resume from: {}", url);

    let failed = |reason: String| FolioError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FolioError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let temp_dir = TempDir::new().map_err(|e| FolioError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    check_magic(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| FolioError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of `url` when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "resume.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cv.pdf"));
        assert!(is_url("http://example.com/cv.pdf"));
        assert!(!is_url("/tmp/cv.pdf"));
        assert!(!is_url("cv.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_prefers_last_segment() {
        assert_eq!(filename_from_url("https://x.org/a/jane_cv.pdf"), "jane_cv.pdf");
        assert_eq!(filename_from_url("https://x.org/download?id=3"), "resume.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, FolioError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_invalid() {
        let err = resolve_input("ftp://example.com/cv.pdf", 5).await.unwrap_err();
        assert!(matches!(err, FolioError::InvalidInput { .. }));
        let err = resolve_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, FolioError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn non_pdf_file_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 a zip, not a pdf").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, FolioError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[tokio::test]
    async fn pdf_file_resolves_locally() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        let resolved = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[tokio::test]
    async fn truncated_file_is_not_a_pdf() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, FolioError::NotAPdf { magic, .. } if &magic == b"%P\0\0"));
    }

    #[test]
    fn spooled_bytes_are_checked_and_written() {
        assert!(matches!(spool_bytes(b"hi"), Err(FolioError::NotAPdf { .. })));
        let resolved = spool_bytes(b"%PDF-1.4 body").unwrap();
        assert_eq!(std::fs::read(resolved.path()).unwrap(), b"%PDF-1.4 body");
    }
}
