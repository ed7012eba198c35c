//! Format detection: decide what an uploaded buffer actually is.
//!
//! The declared media type of an upload is only a hint (browsers and file
//! managers guess from the extension), so detection looks at magic bytes
//! first and falls back to the file name. Zip-based office formats share
//! one magic number, so for those the extension decides between word
//! processing, spreadsheet and presentation packages.

pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const ZIP: &str = "application/zip";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Broad family of an uploaded file, used to dispatch adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    WordDocument,
    Spreadsheet,
    Presentation,
    /// Any other zip container (odt, ods, plain zip).
    Container,
    Unknown,
}

impl FileKind {
    /// Classify a media type.
    pub fn from_media_type(media_type: &str) -> Self {
        let mt = media_type.to_ascii_lowercase();
        if mt == PDF {
            FileKind::Pdf
        } else if mt.starts_with("image/") {
            FileKind::Image
        } else if mt == DOCX {
            FileKind::WordDocument
        } else if mt == XLSX {
            FileKind::Spreadsheet
        } else if mt == PPTX {
            FileKind::Presentation
        } else if mt == ZIP || mt.starts_with("application/vnd.oasis.opendocument") {
            FileKind::Container
        } else {
            FileKind::Unknown
        }
    }

    /// True for every zip-based document format.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            FileKind::WordDocument | FileKind::Spreadsheet | FileKind::Presentation | FileKind::Container
        )
    }
}

/// Work out the media type of `bytes`, using `name` to disambiguate.
pub fn sniff_media_type(bytes: &[u8], name: &str) -> String {
    if bytes.starts_with(b"%PDF") {
        return PDF.to_string();
    }
    if bytes.starts_with(b"PK\x03\x04") {
        let guessed = guess_from_name(name);
        return match FileKind::from_media_type(&guessed) {
            k if k.is_container() => guessed,
            _ => ZIP.to_string(),
        };
    }
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    guess_from_name(name)
}

fn guess_from_name(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_magic_wins_over_name() {
        assert_eq!(sniff_media_type(b"%PDF-1.7\n...", "notes.txt"), PDF);
    }

    #[test]
    fn zip_uses_extension() {
        let zip = b"PK\x03\x04rest-of-archive";
        assert_eq!(sniff_media_type(zip, "cv.docx"), DOCX);
        assert_eq!(sniff_media_type(zip, "budget.xlsx"), XLSX);
        assert_eq!(sniff_media_type(zip, "deck.pptx"), PPTX);
        assert_eq!(sniff_media_type(zip, "bundle.bin"), ZIP);
    }

    #[test]
    fn png_magic() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(sniff_media_type(png, "photo"), "image/png");
    }

    #[test]
    fn falls_back_to_extension() {
        assert_eq!(sniff_media_type(b"hello", "readme.txt"), "text/plain");
        assert_eq!(sniff_media_type(b"hello", "noext"), OCTET_STREAM);
    }

    #[test]
    fn kinds() {
        assert_eq!(FileKind::from_media_type("IMAGE/JPEG"), FileKind::Image);
        assert_eq!(FileKind::from_media_type(DOCX), FileKind::WordDocument);
        assert_eq!(
            FileKind::from_media_type("application/vnd.oasis.opendocument.text"),
            FileKind::Container
        );
        assert!(FileKind::Spreadsheet.is_container());
        assert!(!FileKind::Pdf.is_container());
        assert_eq!(FileKind::from_media_type("text/plain"), FileKind::Unknown);
    }
}
