//! Error types for the toolverse library.
//!
//! Every tool action is a single attempt: an error is scoped to the one
//! operation that raised it and is never retried. [`ToolverseError`] covers
//! the whole taxonomy, and [`ToolverseError::user_message`] turns any of
//! them into the short inline message shown next to the control that
//! triggered the action.
//!
//! [`Stage`] names the step of an adapter that failed so the message can say
//! *where* things went wrong ("could not rasterise page", "could not read
//! the archive") rather than only *what* went wrong.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The pipeline step an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Detect,
    Rasterise,
    Encode,
    Package,
    Preview,
    Generate,
    Parse,
    Store,
    Write,
    Configure,
    Process,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Read => "reading the file",
            Stage::Detect => "detecting the file type",
            Stage::Rasterise => "rasterising the page",
            Stage::Encode => "encoding the image",
            Stage::Package => "repackaging the document",
            Stage::Preview => "building the preview",
            Stage::Generate => "generating content",
            Stage::Parse => "parsing the response",
            Stage::Store => "saving notes",
            Stage::Write => "writing the output",
            Stage::Configure => "reading the configuration",
            Stage::Process => "processing the request",
        };
        f.write_str(s)
    }
}

/// All errors returned by the toolverse library.
#[derive(Debug, Error)]
pub enum ToolverseError {
    // ── Remote service ───────────────────────────────────────────────────
    /// Network failure or a non-success answer from the generation service.
    #[error("Request to the generation service failed: {detail}")]
    Transport {
        status: Option<u16>,
        detail: String,
    },

    /// The service answered but produced no usable text.
    #[error("The model returned an empty result")]
    EmptyGenerationResult,

    /// Image synthesis answered without an inline image part.
    #[error("No image data found in response")]
    NoImageInResponse,

    /// Speech synthesis answered without inline audio.
    #[error("No audio generated")]
    NoAudioInResponse,

    /// No API key configured for the generation service.
    #[error("API key is missing.\nSet GEMINI_API_KEY (or API_KEY) or pass --api-key.")]
    ApiKeyMissing,

    // ── Source files ─────────────────────────────────────────────────────
    /// The source bytes are malformed, encrypted, or use an unsupported codec.
    #[error("Could not decode '{name}' while {stage}: {detail}")]
    Decode {
        stage: Stage,
        name: String,
        detail: String,
    },

    /// A container document held no raster images to re-encode.
    #[error("No compressible images found in '{name}'")]
    NothingToCompress { name: String },

    /// An adapter was invoked on a media type it does not handle.
    #[error("Unsupported file type '{media_type}' for {operation}")]
    UnsupportedFileType {
        media_type: String,
        operation: &'static str,
    },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    // ── Output ───────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local notes store could not be read or written.
    #[error("Notes store error at '{path}': {detail}")]
    Store { path: PathBuf, detail: String },

    // ── Forms ────────────────────────────────────────────────────────────
    /// A required form field was left blank.
    #[error("'{field}' is required")]
    MissingInput { field: &'static str },

    // ── Session ──────────────────────────────────────────────────────────
    /// The tool already has an operation in flight.
    #[error("'{tool}' is still working on the previous request")]
    Busy { tool: String },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolverseError {
    pub(crate) fn decode(stage: Stage, name: impl Into<String>, detail: impl fmt::Display) -> Self {
        ToolverseError::Decode {
            stage,
            name: name.into(),
            detail: detail.to_string(),
        }
    }

    /// The stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            ToolverseError::Transport { .. }
            | ToolverseError::EmptyGenerationResult
            | ToolverseError::NoImageInResponse
            | ToolverseError::NoAudioInResponse
            | ToolverseError::ApiKeyMissing
            | ToolverseError::Busy { .. } => Stage::Generate,
            ToolverseError::Decode { stage, .. } => *stage,
            ToolverseError::NothingToCompress { .. } => Stage::Package,
            ToolverseError::UnsupportedFileType { .. } => Stage::Detect,
            ToolverseError::FileNotFound { .. } | ToolverseError::MissingInput { .. } => Stage::Read,
            ToolverseError::OutputWriteFailed { .. } => Stage::Write,
            ToolverseError::Store { .. } => Stage::Store,
            ToolverseError::InvalidConfig(_) => Stage::Configure,
            ToolverseError::PdfiumBindingFailed(_) => Stage::Rasterise,
            ToolverseError::Internal(_) => Stage::Process,
        }
    }

    /// A one-line message suitable for display next to the triggering control.
    pub fn user_message(&self) -> String {
        match self {
            ToolverseError::NothingToCompress { .. } => {
                "No images found inside this document, so there is nothing to compress.".to_string()
            }
            ToolverseError::Busy { .. } => "Please wait for the current request to finish.".to_string(),
            ToolverseError::ApiKeyMissing => "The API key is not configured.".to_string(),
            ToolverseError::MissingInput { field } => format!("Please fill in the {field} field."),
            other => {
                let first_line = other.to_string();
                let first_line = first_line.lines().next().unwrap_or_default().to_string();
                format!("Failed while {}: {}", other.stage(), first_line)
            }
        }
    }
}

impl From<reqwest::Error> for ToolverseError {
    fn from(e: reqwest::Error) -> Self {
        ToolverseError::Transport {
            status: e.status().map(|s| s.as_u16()),
            detail: e.without_url().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_message_names_stage() {
        let e = ToolverseError::decode(Stage::Rasterise, "report.pdf", "bad xref");
        let msg = e.user_message();
        assert!(msg.contains("rasterising the page"), "got: {msg}");
        assert!(msg.contains("report.pdf"), "got: {msg}");
    }

    #[test]
    fn nothing_to_compress_has_friendly_message() {
        let e = ToolverseError::NothingToCompress {
            name: "cv.docx".into(),
        };
        assert_eq!(e.stage(), Stage::Package);
        assert!(e.user_message().contains("nothing to compress"));
    }

    #[test]
    fn transport_display() {
        let e = ToolverseError::Transport {
            status: Some(503),
            detail: "HTTP 503: overloaded".into(),
        };
        assert!(e.to_string().contains("overloaded"));
        assert!(e.user_message().starts_with("Failed while generating content"));
    }

    #[test]
    fn unsupported_type_display() {
        let e = ToolverseError::UnsupportedFileType {
            media_type: "text/plain".into(),
            operation: "compression",
        };
        assert!(e.to_string().contains("text/plain"));
        assert!(e.to_string().contains("compression"));
    }

    #[test]
    fn missing_input_names_field() {
        let e = ToolverseError::MissingInput { field: "topic" };
        assert_eq!(e.user_message(), "Please fill in the topic field.");
        assert_eq!(e.to_string(), "'topic' is required");
    }

    #[test]
    fn config_and_internal_name_their_own_stage() {
        let e = ToolverseError::InvalidConfig("raster scale 9 is out of range".into());
        assert_eq!(e.stage(), Stage::Configure);
        assert!(e.user_message().starts_with("Failed while reading the configuration"));
        let e = ToolverseError::Internal("worker panicked".into());
        assert_eq!(e.stage(), Stage::Process);
        assert!(e.user_message().starts_with("Failed while processing the request"));
    }

    #[test]
    fn pdfium_message_is_single_line_for_users() {
        let e = ToolverseError::PdfiumBindingFailed("not found".into());
        assert!(!e.user_message().contains('\n'));
    }
}
