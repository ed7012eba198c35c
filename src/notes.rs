//! Personal notes kept in a small string-keyed store.
//!
//! The store is a JSON object file mapping keys to strings. Notes live
//! under the `notes` key as a JSON-encoded list of strings. The file is
//! read once when the store is opened and rewritten after every change.
//! Other keys in the file are carried along untouched.

use crate::error::ToolverseError;
use crate::output::write_atomic;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const NOTES_KEY: &str = "notes";

#[derive(Debug)]
pub struct NotesStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    notes: Vec<String>,
}

impl NotesStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ToolverseError> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, String> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| store_error(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(store_error(&path, e)),
        };
        let notes: Vec<String> = match entries.get(NOTES_KEY) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| store_error(&path, e))?,
            None => Vec::new(),
        };
        debug!("Opened notes store '{}' ({} notes)", path.display(), notes.len());
        Ok(Self { path, entries, notes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Notes in insertion order.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Append a note. Blank notes are ignored and `false` is returned.
    pub async fn add(&mut self, note: &str) -> Result<bool, ToolverseError> {
        if note.trim().is_empty() {
            return Ok(false);
        }
        self.notes.push(note.to_string());
        self.save().await?;
        info!("Added note #{}", self.notes.len());
        Ok(true)
    }

    /// Remove the note at `index`. Out-of-range indices change nothing.
    pub async fn delete(&mut self, index: usize) -> Result<Option<String>, ToolverseError> {
        if index >= self.notes.len() {
            return Ok(None);
        }
        let removed = self.notes.remove(index);
        self.save().await?;
        info!("Deleted note #{}", index + 1);
        Ok(Some(removed))
    }

    async fn save(&mut self) -> Result<(), ToolverseError> {
        let encoded = serde_json::to_string(&self.notes).map_err(|e| store_error(&self.path, e))?;
        self.entries.insert(NOTES_KEY.to_string(), encoded);
        let body = serde_json::to_vec_pretty(&self.entries).map_err(|e| store_error(&self.path, e))?;
        write_atomic(&self.path, &body)
            .await
            .map_err(|e| store_error(&self.path, e))
    }
}

fn store_error(path: &Path, detail: impl std::fmt::Display) -> ToolverseError {
    ToolverseError::Store {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}
