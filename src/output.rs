//! Result types returned by the adapters and tools.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a conversion can hand back.
///
/// Every variant that ends up on disk carries a suggested file name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionResult {
    /// Rich text (Markdown) shown inline.
    PlainText { text: String, suggested_name: String },
    /// A file the user downloads.
    DownloadableBinary {
        #[serde(skip)]
        bytes: Vec<u8>,
        media_type: String,
        suggested_name: String,
    },
    /// An image shown inline, also downloadable.
    RenderableImage {
        #[serde(skip)]
        bytes: Vec<u8>,
        media_type: String,
        suggested_name: String,
    },
    /// An HTML preview awaiting a separate finalize action.
    PreviewableMarkup { preview: Preview, suggested_name: String },
}

impl ConversionResult {
    pub fn suggested_name(&self) -> &str {
        match self {
            ConversionResult::PlainText { suggested_name, .. }
            | ConversionResult::DownloadableBinary { suggested_name, .. }
            | ConversionResult::RenderableImage { suggested_name, .. }
            | ConversionResult::PreviewableMarkup { suggested_name, .. } => suggested_name,
        }
    }

    /// Bytes written when the result is saved.
    pub fn payload(&self) -> &[u8] {
        match self {
            ConversionResult::PlainText { text, .. } => text.as_bytes(),
            ConversionResult::DownloadableBinary { bytes, .. } | ConversionResult::RenderableImage { bytes, .. } => {
                bytes
            }
            ConversionResult::PreviewableMarkup { preview, .. } => preview.markup.as_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewKind {
    Word,
    Spreadsheet,
}

/// HTML rendering of a word or spreadsheet document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub markup: String,
    pub source_name: String,
    pub kind: PreviewKind,
}

impl Preview {
    /// Wrap the markup in a standalone HTML page for a browser or headless
    /// renderer to snapshot.
    pub fn to_html_page(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
<style>body{{font-family:sans-serif;margin:2em;background:#fff}}\
table{{border-collapse:collapse}}td{{border:1px solid #ccc;padding:4px 8px}}</style>\n\
</head>\n<body>\n{}</body>\n</html>\n",
            self.source_name, self.markup
        )
    }
}

/// An image returned by image synthesis.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl GeneratedImage {
    /// File extension matching the media type.
    pub fn extension(&self) -> &'static str {
        match self.media_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Structured answer of the budget planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    /// Markdown advice.
    pub analysis: String,
    pub categories: Vec<BudgetCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub name: String,
    pub value: f64,
}

impl BudgetPlan {
    pub fn total(&self) -> f64 {
        self.categories.iter().map(|c| c.value).sum()
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename, creating
/// parent directories as needed.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_and_name() {
        let r = ConversionResult::PlainText {
            text: "# Hi".into(),
            suggested_name: "summary.md".into(),
        };
        assert_eq!(r.payload(), b"# Hi");
        assert_eq!(r.suggested_name(), "summary.md");
    }

    #[test]
    fn json_omits_bytes() {
        let r = ConversionResult::DownloadableBinary {
            bytes: vec![1, 2, 3],
            media_type: "application/pdf".into(),
            suggested_name: "a.pdf".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["type"], "downloadable_binary");
        assert!(v.get("bytes").is_none());
    }

    #[test]
    fn budget_parses_and_totals() {
        let plan: BudgetPlan = serde_json::from_str(
            r#"{"analysis":"Save more","categories":[{"name":"Rent","value":1200},{"name":"Food","value":300.5}]}"#,
        )
        .unwrap();
        assert_eq!(plan.categories.len(), 2);
        assert!((plan.total() - 1500.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn atomic_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/deep/a.txt");
        write_atomic(&path, b"hello").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!dir.path().join("out/deep/a.txt.tmp").exists());
    }

    #[test]
    fn html_page_wraps_markup() {
        let p = Preview {
            markup: "<p>x</p>".into(),
            source_name: "a.docx".into(),
            kind: PreviewKind::Word,
        };
        let page = p.to_html_page();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<p>x</p>"));
    }
}
