//! Artifact store: the fixed files a session reads and writes.
//!
//! | File | Written by | Read by |
//! |------|------------|---------|
//! | `parser.json` | structuring | (callers, debugging) |
//! | `templates/generated_template.html` | layout generation | rendering |
//! | `index.html` | rendering | (the user's browser) |
//!
//! Every write goes to a sibling temp file which is then renamed over the
//! target, so a reader never observes a half-written artifact.

use crate::error::FolioError;
use crate::output::ArtifactPaths;
use crate::resume::StructuredResume;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RESUME_FILE: &str = "parser.json";
pub const LAYOUT_FILE: &str = "templates/generated_template.html";
pub const PORTFOLIO_FILE: &str = "index.html";

/// Owns the artifact paths of one session's working directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resume_path(&self) -> PathBuf {
        self.root.join(RESUME_FILE)
    }

    pub fn layout_path(&self) -> PathBuf {
        self.root.join(LAYOUT_FILE)
    }

    pub fn portfolio_path(&self) -> PathBuf {
        self.root.join(PORTFOLIO_FILE)
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            resume: self.resume_path(),
            layout: self.layout_path(),
            portfolio: self.portfolio_path(),
        }
    }

    /// Write the structured resume as pretty-printed JSON.
    pub async fn save_resume(&self, resume: &StructuredResume) -> Result<PathBuf, FolioError> {
        let path = self.resume_path();
        write_atomic(&path, resume.to_pretty_json().as_bytes()).await?;
        Ok(path)
    }

    /// Replace the active layout template.
    pub async fn save_layout(&self, layout: &str) -> Result<PathBuf, FolioError> {
        let path = self.layout_path();
        write_atomic(&path, layout.as_bytes()).await?;
        Ok(path)
    }

    /// Write the rendered page.
    pub async fn save_portfolio(&self, html: &str) -> Result<PathBuf, FolioError> {
        let path = self.portfolio_path();
        write_atomic(&path, html.as_bytes()).await?;
        Ok(path)
    }

    /// Read the active layout template back.
    pub async fn load_layout(&self) -> Result<String, FolioError> {
        let path = self.layout_path();
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| FolioError::ArtifactReadFailed { path, source })
    }
}

/// Write `contents` to `path` via a temp file in the same directory.
///
/// Parent directories are created as needed.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), FolioError> {
    let fail = |source| FolioError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn artifacts_use_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let resume = StructuredResume::from_value(json!({"name": "Ann"})).unwrap();

        store.save_resume(&resume).await.unwrap();
        store.save_layout("<html>{{ name }}</html>").await.unwrap();
        store.save_portfolio("<html>Ann</html>").await.unwrap();

        assert!(dir.path().join("parser.json").is_file());
        assert!(dir.path().join("templates/generated_template.html").is_file());
        assert!(dir.path().join("index.html").is_file());
        assert!(!dir.path().join("index.html.tmp").exists());
    }

    #[tokio::test]
    async fn layout_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save_layout("first").await.unwrap();
        store.save_layout("second").await.unwrap();
        assert_eq!(store.load_layout().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn missing_layout_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load_layout().await.unwrap_err();
        assert!(matches!(err, FolioError::ArtifactReadFailed { .. }));
    }

    #[tokio::test]
    async fn resume_file_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let resume = StructuredResume::from_value(json!({"name": "Ann"})).unwrap();
        let path = store.save_resume(&resume).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "{\n  \"name\": \"Ann\"\n}");
    }
}
