//! # toolverse
//!
//! Document conversion, compression and Gemini-backed writing tools.
//!
//! Every user action is one request and one response. A conversion takes an
//! [`UploadedFile`] and returns a [`ConversionResult`]; a tool takes form
//! fields and returns text, a structured plan, an image or a speech clip.
//! Only the summary, the PDF extraction requests and the [`Tools`] talk to
//! the generation service. Everything else runs locally.
//!
//! ## Conversions
//!
//! | Request | Local / remote | Result |
//! |---------|----------------|--------|
//! | `Summarize` | remote | rich text |
//! | `PdfToWord` | remote | Markdown |
//! | `PdfToExcel` | remote | CSV download |
//! | `WordToPdf`, `ExcelToPdf` | local | HTML preview, then a one-page PDF |
//! | `ImageToPdf` | local | PDF download |
//! | `PdfToImage` | local (pdfium) | PNG |
//! | `CompressFile`, `CompressImage` | local | same kind of file, smaller |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toolverse::{CompressionLevel, ConversionRequest, Converter, ToolverseConfig, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ToolverseConfig::default());
//!     let file = UploadedFile::read("photo.png").await?;
//!     let result = converter
//!         .convert(ConversionRequest::CompressImage { file, level: CompressionLevel::Medium })
//!         .await?;
//!     std::fs::write(result.suggested_name(), result.payload())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `toolverse` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! PDF rendering needs a pdfium shared library at runtime, found through
//! `PDFIUM_LIB_PATH` or the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod display;
pub mod error;
pub mod generation;
pub mod notes;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CompressionLevel, Preset, SummaryDetail, ToolverseConfig, ToolverseConfigBuilder};
pub use convert::{ConversionRequest, Converter};
pub use display::{Delivered, DisplayStrategy, Sink};
pub use error::{Stage, ToolverseError};
pub use generation::audio::{AudioBuffer, Playback, SpeechClip};
pub use generation::{GenerationBackend, GenerationClient};
pub use notes::NotesStore;
pub use options::{AspectRatio, Genre, Language, Platform, Tone, Voice};
pub use output::{BudgetCategory, BudgetPlan, ConversionResult, GeneratedImage, Preview, PreviewKind};
pub use pipeline::input::UploadedFile;
pub use progress::{ProgressCallback, StepProgressCallback};
pub use prompts::StoryBrief;
pub use session::{Session, Ticket, ToolId};
pub use tools::Tools;
