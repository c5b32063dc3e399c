//! Result document persistence.
//!
//! The output file is both the write target and the cache read back by
//! the freshness gate and the failure fallback.

use crate::document::ResultDocument;
use crate::error::{ProfileError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Storage handle for the result document
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored document.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(&self) -> Result<Option<ResultDocument>> {
        if !self.path.exists() {
            debug!("Result file not found: {:?}", self.path);
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let document = serde_json::from_str(&content)?;
        Ok(Some(document))
    }

    /// Overwrite the stored document with `document`.
    ///
    /// Writes to a sibling temp file and renames it over the target, so
    /// readers never see a half-written file.
    pub fn save(&self, document: &ResultDocument) -> Result<()> {
        let mut content = serde_json::to_string_pretty(document)?;
        content.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|e| ProfileError::Io(e.error))?;

        debug!(
            path = ?self.path,
            publications = document.publications.len(),
            "Saved result document"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AuthorProfile, Publication, ScraperMethod};
    use chrono::Local;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ResultStore::new(dir.path().join("gs_data.json"));
        assert!(store.load()?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ResultStore::new(dir.path().join("gs_data.json"));

        let profile = AuthorProfile {
            name: "张三".to_string(),
            ..Default::default()
        };
        let doc = ResultDocument::assemble(
            profile,
            vec![Publication {
                title: "Über alles".to_string(),
                citations: 3,
                ..Default::default()
            }],
            ScraperMethod::Direct,
            None,
            Local::now(),
        );
        store.save(&doc)?;

        let raw = std::fs::read_to_string(store.path())?;
        assert!(raw.contains("张三"), "non-ASCII must not be escaped");
        assert!(raw.contains("\n  \"name\""), "expected 2-space pretty print");

        let loaded = store.load()?.expect("document present");
        assert_eq!(loaded, doc);
        Ok(())
    }

    #[test]
    fn test_load_garbage_is_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("gs_data.json");
        std::fs::write(&path, "{ not json")?;
        let store = ResultStore::new(path);
        assert!(matches!(store.load(), Err(ProfileError::Json(_))));
        Ok(())
    }
}
