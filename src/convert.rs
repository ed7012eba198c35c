//! Conversion entry points: one [`ConversionRequest`] in, one
//! [`ConversionResult`] out.
//!
//! Only the summary and the two PDF extraction requests contact the
//! generation service; everything else is a local transformation. Each
//! request is a single attempt that either produces the whole result or an
//! error naming the stage that failed. There is no partial output.

use crate::config::{CompressionLevel, SummaryDetail, ToolverseConfig};
use crate::error::{Stage, ToolverseError};
use crate::generation::{GenerationClient, InlineData};
use crate::output::{ConversionResult, Preview};
use crate::pipeline::detect::{FileKind, PDF};
use crate::pipeline::input::UploadedFile;
use crate::pipeline::paged::{self, PageImage};
use crate::pipeline::{encode, package, postprocess, preview, render};
use crate::progress::{self, ProgressCallback};
use crate::prompts;
use futures::stream::{StreamExt, TryStreamExt};
use std::time::Instant;
use tracing::{debug, info};

/// Default page for PDF → image.
pub const DEFAULT_PAGE: usize = 1;
/// Default magnification for PDF → image.
pub const DEFAULT_SCALE: f32 = 2.0;

/// Pages JPEG-encoded at once while compressing a PDF.
const ENCODE_CONCURRENCY: usize = 4;

/// A conversion the user asked for, with its source and options.
#[derive(Debug, Clone)]
pub enum ConversionRequest {
    Summarize { file: UploadedFile, detail: SummaryDetail },
    PdfToWord { file: UploadedFile },
    PdfToExcel { file: UploadedFile },
    /// Produces a preview; see [`Converter::finalize_preview`].
    WordToPdf { file: UploadedFile },
    /// Produces a preview of the first sheet; see [`Converter::finalize_preview`].
    ExcelToPdf { file: UploadedFile },
    ImageToPdf { file: UploadedFile },
    /// `page` is 1-indexed.
    PdfToImage { file: UploadedFile, page: usize, scale: f32 },
    CompressFile { file: UploadedFile, level: CompressionLevel },
    CompressImage { file: UploadedFile, level: CompressionLevel },
}

impl ConversionRequest {
    pub fn file(&self) -> &UploadedFile {
        match self {
            ConversionRequest::Summarize { file, .. }
            | ConversionRequest::PdfToWord { file }
            | ConversionRequest::PdfToExcel { file }
            | ConversionRequest::WordToPdf { file }
            | ConversionRequest::ExcelToPdf { file }
            | ConversionRequest::ImageToPdf { file }
            | ConversionRequest::PdfToImage { file, .. }
            | ConversionRequest::CompressFile { file, .. }
            | ConversionRequest::CompressImage { file, .. } => file,
        }
    }

    /// Short name used in logs and messages.
    pub fn label(&self) -> &'static str {
        match self {
            ConversionRequest::Summarize { .. } => "summarize",
            ConversionRequest::PdfToWord { .. } => "pdf-to-word",
            ConversionRequest::PdfToExcel { .. } => "pdf-to-excel",
            ConversionRequest::WordToPdf { .. } => "word-to-pdf",
            ConversionRequest::ExcelToPdf { .. } => "excel-to-pdf",
            ConversionRequest::ImageToPdf { .. } => "image-to-pdf",
            ConversionRequest::PdfToImage { .. } => "pdf-to-image",
            ConversionRequest::CompressFile { .. } => "compress-file",
            ConversionRequest::CompressImage { .. } => "compress-image",
        }
    }

    /// True when the request needs the generation service.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ConversionRequest::Summarize { .. } | ConversionRequest::PdfToWord { .. } | ConversionRequest::PdfToExcel { .. }
        )
    }
}

/// Runs conversions with a shared configuration.
pub struct Converter {
    config: ToolverseConfig,
    generation: Option<GenerationClient>,
    progress: ProgressCallback,
}

impl Converter {
    pub fn new(config: ToolverseConfig) -> Self {
        Self {
            config,
            generation: None,
            progress: progress::noop(),
        }
    }

    /// Use this client for remote conversions instead of one built from
    /// the configuration.
    pub fn with_generation(mut self, client: GenerationClient) -> Self {
        self.generation = Some(client);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ToolverseConfig {
        &self.config
    }

    fn generation(&self) -> Result<GenerationClient, ToolverseError> {
        match &self.generation {
            Some(client) => Ok(client.clone()),
            None => GenerationClient::from_config(&self.config),
        }
    }

    /// Run one conversion.
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConversionResult, ToolverseError> {
        let start = Instant::now();
        let label = request.label();
        info!("{}: '{}' ({})", label, request.file().name, request.file().media_type);

        let result = match request {
            ConversionRequest::Summarize { file, detail } => self.summarize(&file, detail).await,
            ConversionRequest::PdfToWord { file } => self.pdf_to_markdown(&file).await,
            ConversionRequest::PdfToExcel { file } => self.pdf_to_csv(&file).await,
            ConversionRequest::WordToPdf { file } => preview_result(preview::word_preview(&file), &file),
            ConversionRequest::ExcelToPdf { file } => preview_result(preview::spreadsheet_preview(&file), &file),
            ConversionRequest::ImageToPdf { file } => image_to_pdf(file).await,
            ConversionRequest::PdfToImage { file, page, scale } => self.pdf_to_image(&file, page, scale).await,
            ConversionRequest::CompressFile { file, level } => self.compress_file(file, level).await,
            ConversionRequest::CompressImage { file, level } => compress_image(file, level).await,
        }?;

        info!(
            "{} finished in {}ms → {} ({} bytes)",
            label,
            start.elapsed().as_millis(),
            result.suggested_name(),
            result.payload().len()
        );
        Ok(result)
    }

    /// Flatten a rendered preview into a one-page PDF. `snapshot` is the
    /// image of the preview as displayed.
    pub async fn finalize_preview(
        &self,
        preview: &Preview,
        snapshot: &UploadedFile,
    ) -> Result<ConversionResult, ToolverseError> {
        snapshot.require(FileKind::Image, "preview snapshot")?;
        let bytes = snapshot.bytes.clone();
        let name = preview.source_name.clone();
        let pdf = tokio::task::spawn_blocking(move || {
            let img = encode::decode_image(&bytes, &name)?;
            paged::snapshot_to_pdf(&img, &name)
        })
        .await
        .map_err(|e| ToolverseError::Internal(format!("Snapshot task panicked: {e}")))??;

        Ok(ConversionResult::DownloadableBinary {
            bytes: pdf,
            media_type: PDF.to_string(),
            suggested_name: format!("{}.pdf", stem_of(&preview.source_name)),
        })
    }

    // ── Remote conversions ───────────────────────────────────────────────

    async fn summarize(&self, file: &UploadedFile, detail: SummaryDetail) -> Result<ConversionResult, ToolverseError> {
        let text = self.ask_about_pdf(file, prompts::summary(detail), "summary").await?;
        Ok(ConversionResult::PlainText {
            text: postprocess::clean_markdown(&text),
            suggested_name: format!("{}-summary.md", file.stem()),
        })
    }

    async fn pdf_to_markdown(&self, file: &UploadedFile) -> Result<ConversionResult, ToolverseError> {
        let text = self.ask_about_pdf(file, prompts::PDF_TO_MARKDOWN, "PDF to word").await?;
        Ok(ConversionResult::PlainText {
            text: postprocess::clean_markdown(&text),
            suggested_name: format!("{}.md", file.stem()),
        })
    }

    async fn pdf_to_csv(&self, file: &UploadedFile) -> Result<ConversionResult, ToolverseError> {
        let text = self.ask_about_pdf(file, prompts::PDF_TO_CSV, "PDF to excel").await?;
        Ok(ConversionResult::DownloadableBinary {
            bytes: postprocess::clean_csv(&text).into_bytes(),
            media_type: "text/csv".to_string(),
            suggested_name: format!("{}.csv", file.stem()),
        })
    }

    async fn ask_about_pdf(
        &self,
        file: &UploadedFile,
        instruction: &str,
        operation: &'static str,
    ) -> Result<String, ToolverseError> {
        file.require(FileKind::Pdf, operation)?;
        let client = self.generation()?;
        let model = client.text_model().to_string();
        client
            .generate_text(&model, instruction, Some(InlineData::new(PDF, file.bytes.clone())))
            .await
    }

    // ── Local conversions ────────────────────────────────────────────────

    async fn pdf_to_image(&self, file: &UploadedFile, page: usize, scale: f32) -> Result<ConversionResult, ToolverseError> {
        if !(0.25..=8.0).contains(&scale) {
            return Err(ToolverseError::InvalidConfig(format!("Scale must be 0.25–8.0, got {scale}")));
        }
        let raster = render::rasterise_page(file, page, scale, self.config.pdfium_lib_path.clone()).await?;
        let png = tokio::task::spawn_blocking(move || encode::encode_png(&raster.image))
            .await
            .map_err(|e| ToolverseError::Internal(format!("Encode task panicked: {e}")))?
            .map_err(|e| ToolverseError::decode(Stage::Encode, &file.name, e))?;
        Ok(ConversionResult::RenderableImage {
            bytes: png,
            media_type: "image/png".to_string(),
            suggested_name: format!("{}-page-{}.png", file.stem(), page),
        })
    }

    async fn compress_file(&self, file: UploadedFile, level: CompressionLevel) -> Result<ConversionResult, ToolverseError> {
        match file.kind() {
            FileKind::Pdf => self.compress_pdf(&file, level).await,
            FileKind::Image => compress_image(file, level).await,
            kind if kind.is_container() => self.compress_container(file, level).await,
            _ => Err(ToolverseError::UnsupportedFileType {
                media_type: file.media_type.clone(),
                operation: "compression",
            }),
        }
    }

    async fn compress_pdf(&self, file: &UploadedFile, level: CompressionLevel) -> Result<ConversionResult, ToolverseError> {
        let preset = level.preset();
        let quality = preset.quality_percent();
        let pages = render::rasterise_pages(
            file,
            preset.scale,
            self.config.pdfium_lib_path.clone(),
            self.progress.clone(),
            ENCODE_CONCURRENCY,
        )?;

        // Each raster is dropped as soon as its JPEG is ready.
        let encoded: Vec<PageImage> = pages
            .map(|page| {
                let name = file.name.clone();
                async move {
                    let page = page?;
                    tokio::task::spawn_blocking(move || {
                        PageImage::from_image(&page.image, quality, page.width_pt, page.height_pt, &name)
                    })
                    .await
                    .map_err(|e| ToolverseError::Internal(format!("Encode task panicked: {e}")))?
                }
            })
            .buffered(ENCODE_CONCURRENCY)
            .try_collect()
            .await?;

        let page_count = encoded.len();
        let name = file.name.clone();
        let pdf = tokio::task::spawn_blocking(move || paged::assemble(&encoded, &name))
            .await
            .map_err(|e| ToolverseError::Internal(format!("Assemble task panicked: {e}")))??;
        debug!("Compressed '{}': {} → {} bytes", file.name, file.bytes.len(), pdf.len());
        self.progress.on_complete(page_count, pdf.len());

        Ok(ConversionResult::DownloadableBinary {
            bytes: pdf,
            media_type: PDF.to_string(),
            suggested_name: format!("{}-compressed.pdf", file.stem()),
        })
    }

    async fn compress_container(&self, file: UploadedFile, level: CompressionLevel) -> Result<ConversionResult, ToolverseError> {
        let quality = level.preset().quality_percent();
        let suggested_name = compressed_name(&file.name);
        let media_type = file.media_type.clone();
        let progress = self.progress.clone();
        let (bytes, report) = tokio::task::spawn_blocking(move || {
            package::compress_container(&file.bytes, &file.name, quality, &progress)
        })
        .await
        .map_err(|e| ToolverseError::Internal(format!("Repack task panicked: {e}")))??;
        debug!(
            "{} pictures: {} → {} bytes",
            report.images, report.bytes_before, report.bytes_after
        );
        Ok(ConversionResult::DownloadableBinary {
            bytes,
            media_type,
            suggested_name,
        })
    }
}

fn preview_result(preview: Result<Preview, ToolverseError>, file: &UploadedFile) -> Result<ConversionResult, ToolverseError> {
    Ok(ConversionResult::PreviewableMarkup {
        preview: preview?,
        suggested_name: format!("{}.pdf", file.stem()),
    })
}

async fn image_to_pdf(file: UploadedFile) -> Result<ConversionResult, ToolverseError> {
    file.require(FileKind::Image, "image to PDF")?;
    let suggested_name = format!("{}.pdf", file.stem());
    let pdf = tokio::task::spawn_blocking(move || {
        let img = encode::decode_image(&file.bytes, &file.name)?;
        paged::image_to_pdf(&img, &file.name)
    })
    .await
    .map_err(|e| ToolverseError::Internal(format!("Image task panicked: {e}")))??;
    Ok(ConversionResult::DownloadableBinary {
        bytes: pdf,
        media_type: PDF.to_string(),
        suggested_name,
    })
}

async fn compress_image(file: UploadedFile, level: CompressionLevel) -> Result<ConversionResult, ToolverseError> {
    file.require(FileKind::Image, "image compression")?;
    let quality = level.preset().quality_percent();
    let suggested_name = format!("{}-compressed.jpg", file.stem());
    let jpeg = tokio::task::spawn_blocking(move || encode::recompress(&file.bytes, &file.name, quality))
        .await
        .map_err(|e| ToolverseError::Internal(format!("Encode task panicked: {e}")))??;
    Ok(ConversionResult::RenderableImage {
        bytes: jpeg,
        media_type: "image/jpeg".to_string(),
        suggested_name,
    })
}

fn stem_of(name: &str) -> &str {
    std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
}

/// `report.docx` → `report-compressed.docx`.
fn compressed_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-compressed.{ext}"),
        _ => format!("{name}-compressed"),
    }
}
