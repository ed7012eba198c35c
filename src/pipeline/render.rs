//! PDF rasterisation via pdfium.
//!
//! pdfium is not async-safe, so every call goes through
//! `tokio::task::spawn_blocking` and binds its own [`Pdfium`] instance on
//! the worker thread. Pixel size is the page size in points times the
//! magnification factor, rounded by pdfium.

use crate::error::{Stage, ToolverseError};
use crate::pipeline::detect::FileKind;
use crate::pipeline::input::UploadedFile;
use crate::progress::ProgressCallback;
use futures::stream::{self, Stream};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One rendered page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-indexed page number.
    pub number: usize,
    /// Page size in PDF points.
    pub width_pt: f32,
    pub height_pt: f32,
    pub image: DynamicImage,
}

/// Bind pdfium from `lib_dir` when given, otherwise from the system.
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, ToolverseError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ToolverseError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Rasterise one page (1-indexed) at `scale`.
pub async fn rasterise_page(
    file: &UploadedFile,
    page: usize,
    scale: f32,
    lib_dir: Option<PathBuf>,
) -> Result<RasterPage, ToolverseError> {
    file.require(FileKind::Pdf, "PDF to image")?;
    let name = file.name.clone();
    let bytes = file.bytes.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(lib_dir.as_deref())?;
        let document = open(&pdfium, &bytes, &name)?;
        let total = document.pages().len() as usize;
        if page == 0 || page > total {
            return Err(ToolverseError::decode(
                Stage::Rasterise,
                &name,
                format!("page {page} does not exist (document has {total} pages)"),
            ));
        }
        render_one(&document, page, scale, &name)
    })
    .await
    .map_err(|e| ToolverseError::Internal(format!("Render task panicked: {e}")))?
}

/// Rasterise every page at `scale` as a stream, reporting each page to
/// `progress`.
///
/// Rendering runs on one blocking worker that hands pages over a channel
/// holding at most `capacity` of them. The worker waits while the channel is
/// full, so no more than `capacity` rendered pages wait for the consumer at
/// any time. Dropping the stream stops the worker after its current page.
pub fn rasterise_pages(
    file: &UploadedFile,
    scale: f32,
    lib_dir: Option<PathBuf>,
    progress: ProgressCallback,
    capacity: usize,
) -> Result<impl Stream<Item = Result<RasterPage, ToolverseError>> + Send, ToolverseError> {
    file.require(FileKind::Pdf, "PDF rasterisation")?;
    let name = file.name.clone();
    let bytes = file.bytes.clone();
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let worker = tokio::task::spawn_blocking(move || {
        if let Err(e) = render_into(&tx, &bytes, &name, scale, lib_dir.as_deref(), &progress) {
            let _ = tx.blocking_send(Err(e));
        }
    });

    Ok(stream::unfold((rx, Some(worker)), |(mut rx, worker)| async move {
        if let Some(page) = rx.recv().await {
            return Some((page, (rx, worker)));
        }
        // Channel closed: surface a worker panic instead of ending short.
        match worker?.await {
            Ok(()) => None,
            Err(e) => Some((
                Err(ToolverseError::Internal(format!("Render task panicked: {e}"))),
                (rx, None),
            )),
        }
    }))
}

fn render_into(
    tx: &mpsc::Sender<Result<RasterPage, ToolverseError>>,
    bytes: &[u8],
    name: &str,
    scale: f32,
    lib_dir: Option<&Path>,
    progress: &ProgressCallback,
) -> Result<(), ToolverseError> {
    let pdfium = bind_pdfium(lib_dir)?;
    let document = open(&pdfium, bytes, name)?;
    let total = document.pages().len() as usize;
    info!("'{}' loaded: {} pages", name, total);
    progress.on_start(total);

    for number in 1..=total {
        progress.on_step_start(number, total);
        let page = render_one(&document, number, scale, name)?;
        progress.on_step_complete(number, total, page.image.as_bytes().len());
        if tx.blocking_send(Ok(page)).is_err() {
            debug!("'{}': consumer gone, stopping after page {}", name, number);
            break;
        }
    }
    Ok(())
}

fn open<'a>(pdfium: &'a Pdfium, bytes: &'a [u8], name: &str) -> Result<PdfDocument<'a>, ToolverseError> {
    pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{e:?}");
        if detail.contains("Password") || detail.contains("password") {
            ToolverseError::decode(Stage::Rasterise, name, "document is password-protected")
        } else {
            ToolverseError::decode(Stage::Rasterise, name, detail)
        }
    })
}

fn render_one(
    document: &PdfDocument<'_>,
    number: usize,
    scale: f32,
    name: &str,
) -> Result<RasterPage, ToolverseError> {
    let page = document
        .pages()
        .get((number - 1) as PdfPageIndex)
        .map_err(|e| ToolverseError::decode(Stage::Rasterise, name, format!("page {number}: {e:?}")))?;

    let config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| ToolverseError::decode(Stage::Rasterise, name, format!("page {number}: {e:?}")))?;
    let image = bitmap.as_image();

    debug!(
        "Rendered page {} → {}x{} px at {}x",
        number,
        image.width(),
        image.height(),
        scale
    );

    Ok(RasterPage {
        number,
        width_pt: page.width().value,
        height_pt: page.height().value,
        image,
    })
}
