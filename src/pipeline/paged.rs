//! Paged-document assembly: JPEG page images → a new PDF.
//!
//! Every page produced here is a single full-bleed image: compressed PDF
//! pages, the image → PDF tool, and the flattened snapshot of a word or
//! spreadsheet preview. Images are embedded as `DCTDecode` XObjects so the
//! JPEG bytes land in the file as-is and the chosen quality is what the
//! reader sees.

use crate::error::{Stage, ToolverseError};
use crate::pipeline::encode;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

/// A4 width in points.
pub const A4_WIDTH_PT: f32 = 595.28;
/// A4 height in points.
pub const A4_HEIGHT_PT: f32 = 841.89;

/// JPEG quality used when an image is placed on a page without compression
/// being requested.
pub const EMBED_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Landscape when wider than tall.
    pub fn of(width: f32, height: f32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Order a page's two edges for this orientation.
    fn page_box(self, a: f32, b: f32) -> (f32, f32) {
        let (short, long) = if a < b { (a, b) } else { (b, a) };
        match self {
            Orientation::Portrait => (short, long),
            Orientation::Landscape => (long, short),
        }
    }
}

/// One page: an encoded JPEG and the page size it is stretched over.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageImage {
    /// A page the size of the given box, holding `img` encoded at `quality`.
    pub fn from_image(
        img: &DynamicImage,
        quality: u8,
        width_pt: f32,
        height_pt: f32,
        name: &str,
    ) -> Result<Self, ToolverseError> {
        let jpeg = encode::encode_jpeg(img, quality).map_err(|e| ToolverseError::decode(Stage::Encode, name, e))?;
        Ok(Self {
            jpeg,
            pixel_width: img.width(),
            pixel_height: img.height(),
            width_pt,
            height_pt,
        })
    }

    /// A page `width_pt` wide whose height follows the image aspect ratio.
    pub fn fit_width(img: &DynamicImage, quality: u8, width_pt: f32, name: &str) -> Result<Self, ToolverseError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(ToolverseError::decode(Stage::Encode, name, "image has no pixels"));
        }
        let height_pt = width_pt * img.height() as f32 / img.width() as f32;
        Self::from_image(img, quality, width_pt, height_pt, name)
    }
}

/// Place one image on a page as wide as A4; page height follows the image.
pub fn image_to_pdf(img: &DynamicImage, name: &str) -> Result<Vec<u8>, ToolverseError> {
    let page = PageImage::fit_width(img, EMBED_QUALITY, A4_WIDTH_PT, name)?;
    assemble(&[page], name)
}

/// Flatten a rendered preview snapshot into a one-page PDF.
///
/// Landscape snapshots get the A4 long edge as page width so wide tables
/// keep a readable scale.
pub fn snapshot_to_pdf(snapshot: &DynamicImage, name: &str) -> Result<Vec<u8>, ToolverseError> {
    let width_pt = match Orientation::of(snapshot.width() as f32, snapshot.height() as f32) {
        Orientation::Portrait => A4_WIDTH_PT,
        Orientation::Landscape => A4_HEIGHT_PT,
    };
    let page = PageImage::fit_width(snapshot, EMBED_QUALITY, width_pt, name)?;
    assemble(&[page], name)
}

/// Write `pages` into a new PDF, in order.
pub fn assemble(pages: &[PageImage], name: &str) -> Result<Vec<u8>, ToolverseError> {
    build(pages).map_err(|e| ToolverseError::decode(Stage::Package, name, e))
}

fn build(pages: &[PageImage]) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for (i, page) in pages.iter().enumerate() {
        let orientation = Orientation::of(page.width_pt, page.height_pt);
        let (w, h) = orientation.page_box(page.width_pt, page.height_pt);

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => page.pixel_width as i64,
                "Height" => page.pixel_height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            page.jpeg.clone(),
        )
        .with_compression(false);
        let image_id = doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        debug!(
            "Page {}: {:?} {:.1}x{:.1}pt, {} byte JPEG",
            i + 1,
            orientation,
            w,
            h,
            page.jpeg.len()
        );
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
