//! On-disk configuration store.
//!
//! # Responsibilities
//! - Load haproxy.cfg into a cached [`Document`]
//! - Write the document back to the canonical path
//! - Give the caller explicit control over cache lifetime
//!
//! # Design Decisions
//! - No first-access memoization magic: `load()` and `invalidate()` are
//!   explicit, `document_mut()` loads only when nothing is cached yet
//! - Saves go through a temp file in the target directory followed by a
//!   rename, so the service never reloads a half-written config

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::document::Document;
use super::parser::{parse, ParseError};
use super::render::render;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: ParseError },
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    cached: Option<Document>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the on-disk file, replacing any cached document.
    pub fn load(&mut self) -> Result<&mut Document, StoreError> {
        let text = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let doc = parse(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "Loaded proxy configuration");
        self.cached = Some(doc);
        Ok(self.cached.as_mut().unwrap())
    }

    /// The cached document, loading from disk when nothing is cached.
    pub fn document_mut(&mut self) -> Result<&mut Document, StoreError> {
        if self.cached.is_none() {
            self.load()?;
        }
        Ok(self.cached.as_mut().unwrap())
    }

    pub fn document(&mut self) -> Result<&Document, StoreError> {
        Ok(self.document_mut()?)
    }

    /// Drop the cached document; the next access re-reads the file.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Render the cached document and write it to the canonical path.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let doc = self.document_mut()?;
        let text = render(doc);
        let tmp = self.path.with_extension("cfg.new");
        fs::write(&tmp, &text).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), bytes = text.len(), "Saved proxy configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::line::ConfigLine;

    #[test]
    fn test_load_mutate_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haproxy.cfg");
        fs::write(&path, "global\n    daemon\n\ndefaults\n    mode http\n").unwrap();

        let mut store = ConfigStore::new(&path);
        {
            let doc = store.document_mut().unwrap();
            doc.defaults[0]
                .configs
                .push(ConfigLine::new("timeout", "tunnel 1h"));
        }
        store.save().unwrap();

        let mut reread = ConfigStore::new(&path);
        let doc = reread.document().unwrap();
        assert!(doc.defaults[0]
            .configs
            .iter()
            .any(|c| c.keyword == "timeout" && c.value == "tunnel 1h"));
    }

    #[test]
    fn test_invalidate_discards_unsaved_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haproxy.cfg");
        fs::write(&path, "global\n    daemon\n").unwrap();

        let mut store = ConfigStore::new(&path);
        store
            .document_mut()
            .unwrap()
            .global
            .configs
            .push(ConfigLine::new("maxconn", "1"));
        store.invalidate();
        assert_eq!(store.document().unwrap().global.configs.len(), 1);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let mut store = ConfigStore::new("/nonexistent/haproxy.cfg");
        assert!(matches!(store.load(), Err(StoreError::Read { .. })));
    }
}
