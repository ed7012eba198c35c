//! How results are presented, and the file/stdout sink the CLI uses.

use crate::error::ToolverseError;
use crate::generation::audio::SpeechClip;
use crate::output::{write_atomic, ConversionResult, GeneratedImage, Preview};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Presentation chosen for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "display", rename_all = "snake_case")]
pub enum DisplayStrategy {
    /// Markdown rendered inline.
    RichText,
    /// HTML preview shown in place until it is finalized.
    EmbeddedPreview,
    Download { file_name: String, media_type: String },
    /// Playable speech with a stop control.
    Audio,
}

impl DisplayStrategy {
    pub fn for_result(result: &ConversionResult) -> Self {
        match result {
            ConversionResult::PlainText { .. } => DisplayStrategy::RichText,
            ConversionResult::PreviewableMarkup { .. } => DisplayStrategy::EmbeddedPreview,
            ConversionResult::DownloadableBinary {
                media_type,
                suggested_name,
                ..
            }
            | ConversionResult::RenderableImage {
                media_type,
                suggested_name,
                ..
            } => DisplayStrategy::Download {
                file_name: suggested_name.clone(),
                media_type: media_type.clone(),
            },
        }
    }

    pub fn for_image(image: &GeneratedImage, stem: &str) -> Self {
        DisplayStrategy::Download {
            file_name: format!("{stem}.{}", image.extension()),
            media_type: image.media_type.clone(),
        }
    }

    pub fn for_speech(_clip: &SpeechClip) -> Self {
        DisplayStrategy::Audio
    }
}

/// Where a result ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Printed,
    Saved(PathBuf),
}

/// Writes results to stdout or to files.
///
/// Rich text goes to stdout unless an output path is set; everything else
/// is saved to the output path or, failing that, under the suggested name
/// in the working directory.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    output: Option<PathBuf>,
}

impl Sink {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    fn target(&self, suggested_name: &str) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from(suggested_name))
    }

    /// Deliver a conversion result. Previews are saved as standalone HTML.
    pub async fn conversion(&self, result: &ConversionResult, out: &mut impl Write) -> Result<Delivered, ToolverseError> {
        match result {
            ConversionResult::PlainText { text, suggested_name } => self.text(text, suggested_name, out).await,
            ConversionResult::PreviewableMarkup { preview, .. } => self
                .bytes(&preview_name(preview), preview.to_html_page().as_bytes())
                .await
                .map(Delivered::Saved),
            ConversionResult::DownloadableBinary {
                bytes, suggested_name, ..
            }
            | ConversionResult::RenderableImage {
                bytes, suggested_name, ..
            } => self.bytes(suggested_name, bytes).await.map(Delivered::Saved),
        }
    }

    /// Print rich text, or save it when an output path is set.
    pub async fn text(&self, text: &str, suggested_name: &str, out: &mut impl Write) -> Result<Delivered, ToolverseError> {
        if self.output.is_some() {
            return self.bytes(suggested_name, text.as_bytes()).await.map(Delivered::Saved);
        }
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| ToolverseError::OutputWriteFailed {
                path: PathBuf::from("<stdout>"),
                source: e,
            })?;
        Ok(Delivered::Printed)
    }

    pub async fn bytes(&self, suggested_name: &str, bytes: &[u8]) -> Result<PathBuf, ToolverseError> {
        let path = self.target(suggested_name);
        save(&path, bytes).await?;
        Ok(path)
    }

    /// Save a speech clip as WAV.
    pub async fn speech(&self, clip: &SpeechClip, suggested_name: &str) -> Result<PathBuf, ToolverseError> {
        self.bytes(suggested_name, &clip.to_wav()).await
    }
}

fn preview_name(preview: &Preview) -> String {
    let stem = Path::new(&preview.source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    format!("{stem}-preview.html")
}

async fn save(path: &Path, bytes: &[u8]) -> Result<(), ToolverseError> {
    write_atomic(path, bytes)
        .await
        .map_err(|e| ToolverseError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    info!("Wrote {} bytes to '{}'", bytes.len(), path.display());
    Ok(())
}
