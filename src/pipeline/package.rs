//! Container compression: re-encode the pictures inside a zip document.
//!
//! Office formats (docx, pptx, xlsx) keep embedded pictures under a
//! `media/` folder; OpenDocument keeps them under `Pictures/`. Each raster
//! picture is re-encoded as JPEG and written back under the *same* entry
//! name so every relationship pointing at it stays valid. All other entries
//! are copied raw, compression method and all.

use crate::error::{Stage, ToolverseError};
use crate::pipeline::encode;
use crate::progress::ProgressCallback;
use std::io::{Cursor, Read, Write};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Upper bound on the buffer reserved up front for one picture. The size in
/// the zip header is only a claim.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// True when `entry` is a raster picture inside a media folder.
pub fn is_media_entry(entry: &str) -> bool {
    let in_media = entry.split('/').rev().skip(1).any(|dir| dir == "media" || dir == "Pictures");
    let ext = entry.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    in_media && ext.is_some_and(|e| RASTER_EXTENSIONS.contains(&e.as_str()))
}

/// Summary of a container rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackReport {
    /// Pictures actually re-encoded.
    pub images: usize,
    /// Pictures kept as they were because they could not be decoded.
    pub kept: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

/// Rewrite the archive in `bytes` with every media picture at `quality`.
///
/// Runs synchronously; callers on the async side wrap it in
/// `spawn_blocking`. Fails with [`ToolverseError::NothingToCompress`] when
/// the archive holds no raster pictures, or none of them could be decoded.
pub fn compress_container(
    bytes: &[u8],
    name: &str,
    quality: u8,
    progress: &ProgressCallback,
) -> Result<(Vec<u8>, RepackReport), ToolverseError> {
    let package_err = |e: zip::result::ZipError| ToolverseError::decode(Stage::Package, name, e);
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(package_err)?;

    let mut is_media = vec![false; archive.len()];
    for (i, flag) in is_media.iter_mut().enumerate() {
        let entry = archive.by_index(i).map_err(package_err)?;
        *flag = !entry.is_dir() && is_media_entry(entry.name());
    }
    let total = is_media.iter().filter(|m| **m).count();
    if total == 0 {
        info!("'{}' has no embedded pictures", name);
        return Err(ToolverseError::NothingToCompress { name: name.to_string() });
    }
    info!("'{}': re-encoding {} pictures at q{}", name, total, quality);
    progress.on_start(total);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut report = RepackReport {
        images: 0,
        kept: 0,
        bytes_before: 0,
        bytes_after: 0,
    };
    let mut step = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(package_err)?;
        if !is_media[i] {
            writer.raw_copy_file(entry).map_err(package_err)?;
            continue;
        }

        step += 1;
        progress.on_step_start(step, total);
        let entry_name = entry.name().to_string();
        let mut original = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
        entry
            .read_to_end(&mut original)
            .map_err(|e| ToolverseError::decode(Stage::Package, name, format!("{entry_name}: {e}")))?;
        drop(entry);

        let encoded = match encode::recompress(&original, &entry_name, quality) {
            Ok(jpeg) => {
                report.images += 1;
                jpeg
            }
            Err(e) => {
                warn!("Keeping '{}' unchanged: {}", entry_name, e);
                report.kept += 1;
                original.clone()
            }
        };
        debug!("{}: {} → {} bytes", entry_name, original.len(), encoded.len());
        report.bytes_before += original.len();
        report.bytes_after += encoded.len();

        writer.start_file(entry_name.as_str(), options).map_err(package_err)?;
        writer
            .write_all(&encoded)
            .map_err(|e| ToolverseError::decode(Stage::Package, name, e))?;
        progress.on_step_complete(step, total, encoded.len());
    }

    if report.images == 0 {
        info!("'{}': none of its {} pictures could be decoded", name, report.kept);
        return Err(ToolverseError::NothingToCompress { name: name.to_string() });
    }
    let out = writer.finish().map_err(package_err)?.into_inner();
    progress.on_complete(report.images, out.len());
    Ok((out, report))
}
