//! Image encoding: PNG for rasterised pages, JPEG for compression.
//!
//! JPEG has no alpha channel, so anything with transparency is composited
//! onto a white background first. Transparent regions come out white, not
//! black.

use crate::error::{Stage, ToolverseError};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Composite `img` over an opaque white background.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// JPEG-encode `img` at `quality` (1–100) against white.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = flatten_on_white(img);
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
    debug!(
        "Encoded {}x{} JPEG at q{} → {} bytes",
        img.width(),
        img.height(),
        quality,
        buf.len()
    );
    Ok(buf)
}

/// Lossless PNG, used for PDF → image.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded PNG → {} bytes", buf.len());
    Ok(buf)
}

/// Decode an image buffer, naming `name` in the error.
pub fn decode_image(bytes: &[u8], name: &str) -> Result<DynamicImage, ToolverseError> {
    image::load_from_memory(bytes).map_err(|e| ToolverseError::decode(Stage::Encode, name, e))
}

/// Decode, flatten and re-encode an image as JPEG. Pixel dimensions are kept.
pub fn recompress(bytes: &[u8], name: &str, quality: u8) -> Result<Vec<u8>, ToolverseError> {
    let img = decode_image(bytes, name)?;
    encode_jpeg(&img, quality).map_err(|e| ToolverseError::decode(Stage::Encode, name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn transparent_becomes_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn opaque_pixels_untouched() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn half_alpha_blends() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let px = flatten_on_white(&img).get_pixel(0, 0).0;
        assert!((126..=128).contains(&px[0]), "got {px:?}");
    }

    #[test]
    fn recompress_keeps_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(37, 11, Rgba([200, 0, 0, 90])));
        let png = encode_png(&img).unwrap();
        let jpeg = recompress(&png, "red.png", 30).unwrap();
        let back = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(back.dimensions(), (37, 11));
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = recompress(b"not an image", "x.png", 60).unwrap_err();
        assert_eq!(err.stage(), Stage::Encode);
    }
}
