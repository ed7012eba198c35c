//! Local transformation stages used by the conversions.
//!
//! Each submodule does one thing and can be tested on its own.
//!
//! ```text
//! input ──▶ detect ──┬─▶ render ──▶ encode ──▶ paged     (PDF → image, PDF compression)
//!                    ├─▶ encode ──▶ paged                 (image → PDF, image compression)
//!                    ├─▶ package                          (docx/pptx/xlsx compression)
//!                    └─▶ preview ──▶ (snapshot) ──▶ paged (word/excel → PDF)
//! generated text ──▶ postprocess
//! ```
//!
//! 1. [`input`]:   read an upload into memory, once
//! 2. [`detect`]:  media type from magic bytes, then extension
//! 3. [`render`]:  rasterise pages via pdfium; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 4. [`encode`]:  JPEG/PNG encoding, transparency flattened on white
//! 5. [`paged`]:   assemble image pages into a new PDF
//! 6. [`package`]: re-encode pictures inside zip containers
//! 7. [`preview`]: docx/xlsx → HTML
//! 8. [`postprocess`]: deterministic cleanup of generated Markdown and CSV

pub mod detect;
pub mod encode;
pub mod input;
pub mod package;
pub mod paged;
pub mod postprocess;
pub mod preview;
pub mod render;
