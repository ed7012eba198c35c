//! Input capture: turn a user-supplied path into an in-memory upload.
//!
//! Every tool works on a byte buffer, never on a path, so a file is read
//! exactly once (one async read) and then handed around as an
//! [`UploadedFile`]. The media type is sniffed from the bytes, with the
//! extension as a fallback, because declared types are unreliable.

use crate::error::{Stage, ToolverseError};
use crate::pipeline::detect::{self, FileKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file handed to a tool: bytes plus the media type and display name.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedFile {
    /// Wrap bytes whose media type is already known.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Wrap bytes and detect their media type.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = detect::sniff_media_type(&bytes, &name);
        Self {
            name,
            media_type,
            bytes,
        }
    }

    /// Read a file from disk.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ToolverseError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolverseError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ToolverseError::decode(Stage::Read, path.display().to_string(), e),
        })?;
        let name = display_name(path);
        let file = Self::from_bytes(name, bytes);
        debug!(
            "Read '{}' ({} bytes, {})",
            file.name,
            file.bytes.len(),
            file.media_type
        );
        Ok(file)
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_media_type(&self.media_type)
    }

    /// File name without its extension, used to derive output names.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
    }

    /// Fail with `UnsupportedFileType` unless the file is of kind `expected`.
    pub(crate) fn require(&self, expected: FileKind, operation: &'static str) -> Result<(), ToolverseError> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(ToolverseError::UnsupportedFileType {
                media_type: self.media_type.clone(),
                operation,
            })
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}
