//! Document previews: word-processing and spreadsheet packages → HTML.
//!
//! Only what a reader needs to check the document before flattening it to
//! PDF is rendered: paragraphs, headings, bold and italic runs, line
//! breaks, simple lists and tables for word files; the cell grid of the
//! first sheet for workbooks. Workbooks with several sheets only show the
//! first one.
//!
//! The package XML is walked with a small tag scanner that keeps track of
//! nesting, so a table inside a table cell or a text box inside a paragraph
//! stays inside its parent block. Text nodes in the package are already
//! entity-escaped, and XML entities are valid HTML, so text is copied
//! through without re-escaping.

use crate::error::{Stage, ToolverseError};
use crate::output::{Preview, PreviewKind};
use crate::pipeline::detect::FileKind;
use crate::pipeline::input::UploadedFile;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, info};
use zip::ZipArchive;

/// Render a `.docx` upload as an HTML preview.
pub fn word_preview(file: &UploadedFile) -> Result<Preview, ToolverseError> {
    file.require(FileKind::WordDocument, "word preview")?;
    let mut archive = open(file)?;
    let xml = read_entry(&mut archive, "word/document.xml", &file.name)?;
    let markup = render_document(&xml);
    info!("Word preview of '{}': {} bytes of HTML", file.name, markup.len());
    Ok(Preview {
        markup,
        source_name: file.name.clone(),
        kind: PreviewKind::Word,
    })
}

/// Render the first sheet of an `.xlsx` upload as an HTML table.
pub fn spreadsheet_preview(file: &UploadedFile) -> Result<Preview, ToolverseError> {
    file.require(FileKind::Spreadsheet, "spreadsheet preview")?;
    let mut archive = open(file)?;
    let shared = match read_entry(&mut archive, "xl/sharedStrings.xml", &file.name) {
        Ok(xml) => shared_strings(&xml),
        Err(_) => Vec::new(),
    };
    let sheet_path = first_sheet_path(&mut archive, &file.name);
    debug!("'{}': previewing {}", file.name, sheet_path);
    let sheet = read_entry(&mut archive, &sheet_path, &file.name)?;
    let markup = render_sheet(&sheet, &shared, &file.name)?;
    info!("Spreadsheet preview of '{}': {} bytes of HTML", file.name, markup.len());
    Ok(Preview {
        markup,
        source_name: file.name.clone(),
        kind: PreviewKind::Spreadsheet,
    })
}

fn open(file: &UploadedFile) -> Result<ZipArchive<Cursor<&[u8]>>, ToolverseError> {
    ZipArchive::new(Cursor::new(file.bytes.as_slice()))
        .map_err(|e| ToolverseError::decode(Stage::Preview, &file.name, e))
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, entry: &str, name: &str) -> Result<String, ToolverseError> {
    let mut f = archive
        .by_name(entry)
        .map_err(|e| ToolverseError::decode(Stage::Preview, name, format!("{entry}: {e}")))?;
    let mut xml = String::new();
    f.read_to_string(&mut xml)
        .map_err(|e| ToolverseError::decode(Stage::Preview, name, format!("{entry}: {e}")))?;
    Ok(xml)
}

// ── Word documents ───────────────────────────────────────────────────────

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([A-Za-z_][\w:.-]*)[^>]*?(/?)>").unwrap());
static RE_RUN_PIECE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:br\b[^>]*/>|<w:cr\b[^>]*/>|<w:tab\b[^>]*/>").unwrap()
});
static RE_BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:b(?:\s+w:val="(?:1|true|on)")?\s*/>"#).unwrap());
static RE_ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:i(?:\s+w:val="(?:1|true|on)")?\s*/>"#).unwrap());
static RE_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<w:pStyle\s+w:val="([^"]+)""#).unwrap());
const BLOCKS: &[&str] = &["w:p", "w:tbl"];

/// The outermost `names` elements of `xml`, in document order.
///
/// An element with the same name nested inside a match (a table in a table
/// cell, a text-box paragraph inside a paragraph) stays part of the match.
fn outermost<'a>(xml: &'a str, names: &[&str]) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut current: Option<(&str, usize, usize)> = None;

    for tag in RE_TAG.captures_iter(xml) {
        let Some(whole) = tag.get(0) else { continue };
        let closing = tag.get(1).is_some_and(|g| !g.as_str().is_empty());
        let name = tag.get(2).map_or("", |g| g.as_str());
        let self_closing = tag.get(3).is_some_and(|g| !g.as_str().is_empty());

        match current {
            None if !closing && names.contains(&name) => {
                if self_closing {
                    found.push(whole.as_str());
                } else {
                    current = Some((name, whole.start(), 1));
                }
            }
            Some((open, start, depth)) if name == open => {
                if closing && depth == 1 {
                    found.push(&xml[start..whole.end()]);
                    current = None;
                } else if closing {
                    current = Some((open, start, depth - 1));
                } else if !self_closing {
                    current = Some((open, start, depth + 1));
                }
            }
            _ => {}
        }
    }
    found
}

fn render_document(xml: &str) -> String {
    let mut html = String::from("<article class=\"preview\">\n");
    let mut in_list = false;

    for block in outermost(xml, BLOCKS) {
        if block.starts_with("<w:tbl") {
            close_list(&mut html, &mut in_list);
            html.push_str(&render_table(block));
            continue;
        }

        let content = render_runs(block);
        if block.contains("<w:numPr>") {
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str(&format!("<li>{content}</li>\n"));
            continue;
        }
        close_list(&mut html, &mut in_list);

        match heading_level(block) {
            Some(level) => html.push_str(&format!("<h{level}>{content}</h{level}>\n")),
            None if content.is_empty() => html.push_str("<p><br></p>\n"),
            None => html.push_str(&format!("<p>{content}</p>\n")),
        }
    }
    close_list(&mut html, &mut in_list);
    html.push_str("</article>\n");
    html
}

fn close_list(html: &mut String, in_list: &mut bool) {
    if *in_list {
        html.push_str("</ul>\n");
        *in_list = false;
    }
}

/// `Title` → 1, `Heading1`…`Heading6` → 1…6.
fn heading_level(paragraph: &str) -> Option<u8> {
    let style = RE_STYLE.captures(paragraph)?.get(1)?.as_str();
    if style == "Title" {
        return Some(1);
    }
    let n: u8 = style.strip_prefix("Heading")?.parse().ok()?;
    (1..=6).contains(&n).then_some(n)
}

fn render_runs(paragraph: &str) -> String {
    let mut out = String::new();
    for run in outermost(paragraph, &["w:r"]) {
        let props = run.split("</w:rPr>").next().filter(|_| run.contains("</w:rPr>")).unwrap_or("");
        let bold = RE_BOLD.is_match(props);
        let italic = RE_ITALIC.is_match(props);

        let mut text = String::new();
        for piece in RE_RUN_PIECE.captures_iter(run) {
            match piece.get(1) {
                Some(t) => text.push_str(t.as_str()),
                None if piece[0].starts_with("<w:tab") => text.push_str("&emsp;"),
                None => text.push_str("<br>"),
            }
        }
        if text.is_empty() {
            continue;
        }
        match (bold, italic) {
            (true, true) => out.push_str(&format!("<strong><em>{text}</em></strong>")),
            (true, false) => out.push_str(&format!("<strong>{text}</strong>")),
            (false, true) => out.push_str(&format!("<em>{text}</em>")),
            (false, false) => out.push_str(&text),
        }
    }
    out
}

fn render_table(table: &str) -> String {
    let mut html = String::from("<table>\n");
    for row in outermost(table, &["w:tr"]) {
        html.push_str("<tr>");
        for cell in outermost(row, &["w:tc"]) {
            let mut td = String::new();
            for block in outermost(cell, BLOCKS) {
                if block.starts_with("<w:tbl") {
                    td.push_str(&render_table(block));
                } else {
                    if !td.is_empty() && !td.ends_with("</table>\n") {
                        td.push_str("<br>");
                    }
                    td.push_str(&render_runs(block));
                }
            }
            html.push_str(&format!("<td>{td}</td>"));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

// ── Spreadsheets ─────────────────────────────────────────────────────────

static RE_SI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<si\b[^>]*>(.*?)</si>").unwrap());
static RE_T: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<t(?:\s[^>]*)?>([^<]*)</t>").unwrap());
static RE_SHEET_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<sheet\b[^>]*>").unwrap());
static RE_REL_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Relationship\b[^>]*>").unwrap());
static RE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([\w:]+)="([^"]*)""#).unwrap());
static RE_XL_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<row\b[^>]*/>|<row\b[^>]*>(.*?)</row>").unwrap());
static RE_XL_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<c\b([^>]*?)/>|<c\b([^>]*)>(.*?)</c>").unwrap());
static RE_V: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<v>([^<]*)</v>").unwrap());

fn attrs(tag: &str) -> HashMap<&str, &str> {
    RE_ATTR
        .captures_iter(tag)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect()
}

fn shared_strings(xml: &str) -> Vec<String> {
    RE_SI
        .captures_iter(xml)
        .map(|si| RE_T.captures_iter(&si[1]).map(|t| t[1].to_string()).collect())
        .collect()
}

/// Archive path of the first sheet listed in the workbook.
fn first_sheet_path(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> String {
    const FALLBACK: &str = "xl/worksheets/sheet1.xml";
    let (Ok(workbook), Ok(rels)) = (
        read_entry(archive, "xl/workbook.xml", name),
        read_entry(archive, "xl/_rels/workbook.xml.rels", name),
    ) else {
        return FALLBACK.to_string();
    };
    let Some(rel_id) = RE_SHEET_TAG
        .find(&workbook)
        .and_then(|tag| attrs(tag.as_str()).get("r:id").map(|s| s.to_string()))
    else {
        return FALLBACK.to_string();
    };
    RE_REL_TAG
        .find_iter(&rels)
        .map(|tag| attrs(tag.as_str()))
        .find(|a| a.get("Id") == Some(&rel_id.as_str()))
        .and_then(|a| a.get("Target").map(|t| resolve_target(t)))
        .unwrap_or_else(|| FALLBACK.to_string())
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Last column a workbook can address (`XFD`).
const MAX_COLUMN: usize = 16_383;

/// `"BC12"` → `Ok(Some(54))` (0-based column index); no letters → `Ok(None)`.
/// Columns past `XFD` are rejected.
fn column_index(cell_ref: &str) -> Result<Option<usize>, String> {
    let letters = cell_ref.bytes().take_while(u8::is_ascii_alphabetic);
    let mut n = 0usize;
    let mut seen = 0;
    for b in letters {
        seen += 1;
        if seen > 3 {
            return Err(format!("cell reference '{cell_ref}' is beyond column XFD"));
        }
        n = n * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize;
    }
    match n {
        0 => Ok(None),
        n if n - 1 > MAX_COLUMN => Err(format!("cell reference '{cell_ref}' is beyond column XFD")),
        n => Ok(Some(n - 1)),
    }
}

fn cell_value(cell_attrs: &HashMap<&str, &str>, body: &str, shared: &[String]) -> String {
    let raw = RE_V.captures(body).map(|c| c[1].to_string());
    match cell_attrs.get("t").copied() {
        Some("s") => raw
            .and_then(|i| i.trim().parse::<usize>().ok())
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        Some("inlineStr") => RE_T.captures_iter(body).map(|t| t[1].to_string()).collect(),
        Some("b") => match raw.as_deref() {
            Some("1") => "TRUE".to_string(),
            Some(_) => "FALSE".to_string(),
            None => String::new(),
        },
        _ => raw.unwrap_or_default(),
    }
}

fn render_sheet(xml: &str, shared: &[String], name: &str) -> Result<String, ToolverseError> {
    let mut html = String::from("<table class=\"preview\">\n");
    for row in RE_XL_ROW.captures_iter(xml) {
        let Some(body) = row.get(1) else {
            html.push_str("<tr></tr>\n");
            continue;
        };
        let mut cells: Vec<String> = Vec::new();
        for cell in RE_XL_CELL.captures_iter(body.as_str()) {
            let (tag_attrs, inner) = match (cell.get(1), cell.get(2), cell.get(3)) {
                (Some(a), _, _) => (a.as_str(), ""),
                (None, Some(a), Some(b)) => (a.as_str(), b.as_str()),
                _ => continue,
            };
            let a = attrs(tag_attrs);
            let col = match a.get("r") {
                Some(r) => column_index(r).map_err(|e| ToolverseError::decode(Stage::Preview, name, e))?,
                None => None,
            }
            .unwrap_or(cells.len());
            if col >= cells.len() {
                cells.resize(col + 1, String::new());
            }
            cells[col] = cell_value(&a, inner, shared);
        }
        html.push_str("<tr>");
        for value in &cells {
            html.push_str(&format!("<td>{value}</td>"));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn package(name: &str, entries: &[(&str, &str)]) -> UploadedFile {
        let mut w = ZipWriter::new(Cursor::new(Vec::new()));
        for (entry, body) in entries {
            w.start_file(*entry, SimpleFileOptions::default()).unwrap();
            w.write_all(body.as_bytes()).unwrap();
        }
        UploadedFile::from_bytes(name, w.finish().unwrap().into_inner())
    }

    const DOC: &str = r#"<w:document><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Experience</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r><w:r><w:t xml:space="preserve"> and </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>italic</w:t></w:r></w:p>
<w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/></w:numPr></w:pPr><w:r><w:t>Rust &amp; Go</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p/>
</w:body></w:document>"#;

    #[test]
    fn word_preview_renders_structure() {
        let file = package("cv.docx", &[("word/document.xml", DOC)]);
        let preview = word_preview(&file).unwrap();
        let html = preview.markup;
        assert_eq!(preview.kind, PreviewKind::Word);
        assert!(html.contains("<h2>Experience</h2>"), "{html}");
        assert!(html.contains("<p><strong>Bold</strong> and <em>italic</em></p>"), "{html}");
        assert!(html.contains("line one<br>line two"), "{html}");
        assert!(html.contains("<ul>\n<li>Rust &amp; Go</li>\n</ul>"), "{html}");
        assert!(html.contains("<tr><td>A1</td><td>B1</td></tr>"), "{html}");
        assert!(html.contains("<p><br></p>"), "{html}");
    }

    #[test]
    fn word_preview_requires_docx() {
        let file = package("book.xlsx", &[("xl/workbook.xml", "<workbook/>")]);
        assert!(matches!(
            word_preview(&file),
            Err(ToolverseError::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn missing_document_xml_is_preview_error() {
        let file = package("empty.docx", &[("word/styles.xml", "<w:styles/>")]);
        assert_eq!(word_preview(&file).unwrap_err().stage(), Stage::Preview);
    }

    #[test]
    fn spreadsheet_uses_first_sheet() {
        let file = package(
            "budget.xlsx",
            &[
                (
                    "xl/workbook.xml",
                    r#"<workbook><sheets><sheet name="Q1" sheetId="1" r:id="rId7"/><sheet name="Q2" sheetId="2" r:id="rId8"/></sheets></workbook>"#,
                ),
                (
                    "xl/_rels/workbook.xml.rels",
                    r#"<Relationships><Relationship Id="rId8" Target="worksheets/sheet2.xml"/><Relationship Id="rId7" Target="worksheets/sheet1.xml"/></Relationships>"#,
                ),
                ("xl/sharedStrings.xml", r#"<sst><si><t>Rent</t></si><si><r><t>Fo</t></r><r><t>od</t></r></si></sst>"#),
                (
                    "xl/worksheets/sheet1.xml",
                    r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1"><v>1200</v></c></row><row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="b"><v>1</v></c><c r="C2" t="inlineStr"><is><t>n/a</t></is></c></row></sheetData></worksheet>"#,
                ),
                (
                    "xl/worksheets/sheet2.xml",
                    r#"<worksheet><sheetData><row r="1"><c r="A1"><v>999</v></c></row></sheetData></worksheet>"#,
                ),
            ],
        );
        let preview = spreadsheet_preview(&file).unwrap();
        let html = preview.markup;
        assert!(html.contains("<tr><td>Rent</td><td></td><td>1200</td></tr>"), "{html}");
        assert!(html.contains("<tr><td>Food</td><td>TRUE</td><td>n/a</td></tr>"), "{html}");
        assert!(!html.contains("999"));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_index("A1"), Ok(Some(0)));
        assert_eq!(column_index("Z9"), Ok(Some(25)));
        assert_eq!(column_index("AA3"), Ok(Some(26)));
        assert_eq!(column_index("BC12"), Ok(Some(54)));
        assert_eq!(column_index("XFD1"), Ok(Some(MAX_COLUMN)));
        assert_eq!(column_index("12"), Ok(None));
        assert!(column_index("XFE1").is_err());
        assert!(column_index("AAAAAAAA1").is_err());
        assert!(column_index("ZZZZZZZZZZZZZZ1").is_err());
    }

    fn one_sheet(name: &str, cells: &str) -> UploadedFile {
        let sheet = format!("<worksheet><sheetData><row r=\"1\">{cells}</row></sheetData></worksheet>");
        package(name, &[("xl/worksheets/sheet1.xml", sheet.as_str())])
    }

    #[test]
    fn out_of_range_cell_reference_is_preview_error() {
        for r in ["ZZZZZZZZZZZZZZ1", "AAAAAAAA1"] {
            let file = one_sheet("bad.xlsx", &format!(r#"<c r="{r}"><v>1</v></c>"#));
            let err = spreadsheet_preview(&file).unwrap_err();
            assert!(matches!(err, ToolverseError::Decode { stage: Stage::Preview, .. }), "{r}: {err}");
        }
    }

    #[test]
    fn last_column_is_accepted() {
        let file = one_sheet("wide.xlsx", r#"<c r="XFD1"><v>7</v></c>"#);
        let html = spreadsheet_preview(&file).unwrap().markup;
        assert!(html.contains("<td>7</td></tr>"), "{html}");
    }

    #[test]
    fn nested_table_stays_in_its_cell() {
        let doc = r#"<w:document><w:body>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>outer</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:tc><w:tc><w:p><w:r><w:t>right</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>after</w:t></w:r></w:p>
</w:body></w:document>"#;
        let html = word_preview(&package("nested.docx", &[("word/document.xml", doc)])).unwrap().markup;
        assert!(
            html.contains("<tr><td>outer<table>\n<tr><td>inner</td></tr>\n</table>\n</td><td>right</td></tr>"),
            "{html}"
        );
        assert!(html.contains("<p>after</p>"), "{html}");
        assert_eq!(html.matches("<p>").count(), 1, "{html}");
    }

    #[test]
    fn text_box_paragraph_does_not_split_its_parent() {
        let doc = r#"<w:document><w:body>
<w:p><w:r><w:t>Caption </w:t></w:r><w:r><w:drawing><w:txbxContent><w:p><w:r><w:t>boxed</w:t></w:r></w:p></w:txbxContent></w:drawing></w:r><w:r><w:t> tail</w:t></w:r></w:p>
</w:body></w:document>"#;
        let html = word_preview(&package("box.docx", &[("word/document.xml", doc)])).unwrap().markup;
        assert!(html.contains("<p>Caption boxed tail</p>"), "{html}");
        assert_eq!(html.matches("<p>").count(), 1, "{html}");
    }

    #[test]
    fn outermost_skips_nested_matches() {
        let xml = "<a><w:p>x<w:p>y</w:p>z</w:p><w:p/></a>";
        assert_eq!(outermost(xml, &["w:p"]), vec!["<w:p>x<w:p>y</w:p>z</w:p>", "<w:p/>"]);
    }

    #[test]
    fn headings() {
        assert_eq!(heading_level(r#"<w:pStyle w:val="Title"/>"#), Some(1));
        assert_eq!(heading_level(r#"<w:pStyle w:val="Heading3"/>"#), Some(3));
        assert_eq!(heading_level(r#"<w:pStyle w:val="Heading9"/>"#), None);
        assert_eq!(heading_level(r#"<w:pStyle w:val="Normal"/>"#), None);
    }
}
