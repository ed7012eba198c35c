//! Deterministic cleanup of generated text.
//!
//! Models regularly wrap their whole answer in a code fence, mix line
//! endings or sprinkle zero-width characters into the output. These passes
//! fix that without touching content. [`clean_markdown`] is applied to
//! every Markdown answer, [`clean_csv`] to the PDF → spreadsheet extraction.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean a Markdown answer. Passes, in order:
///
/// 1. strip an outer code fence
/// 2. CRLF / CR → LF
/// 3. drop invisible Unicode
/// 4. trim trailing whitespace per line
/// 5. blank line before each heading
/// 6. add the missing separator row under a table header
/// 7. collapse runs of blank lines to one
/// 8. exactly one final newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = unify_newlines(&s);
    let s = drop_invisible(&s);
    let s = trim_line_ends(&s);
    let s = space_headings(&s);
    let s = add_table_separator(&s);
    let s = squeeze_blank_lines(&s);
    final_newline(&s)
}

/// Clean a CSV answer. Blank lines between tables are kept (one each).
pub fn clean_csv(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = unify_newlines(&s);
    let s = drop_invisible(&s);
    let s = trim_line_ends(&s);
    let s = squeeze_blank_lines(s.trim_start_matches('\n'));
    final_newline(&s)
}

// ── Fences ───────────────────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n```[ \t]*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Whitespace ───────────────────────────────────────────────────────────

fn unify_newlines(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn drop_invisible(input: &str) -> String {
    input.replace(['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'], "")
}

fn trim_line_ends(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn squeeze_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

fn final_newline(input: &str) -> String {
    let body = input.trim_end();
    if body.is_empty() {
        "\n".to_string()
    } else {
        format!("{body}\n")
    }
}

// ── Structure ────────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} ").unwrap());

fn space_headings(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_code = false;
    for line in input.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
        }
        let needs_gap = !in_code && RE_HEADING.is_match(line) && out.last().is_some_and(|prev| !prev.is_empty());
        if needs_gap {
            out.push("");
        }
        out.push(line);
    }
    out.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    is_table_row(line) && line.trim().chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn add_table_separator(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        out.push(line.to_string());
        let starts_table = is_table_row(line) && !lines.get(i.wrapping_sub(1)).is_some_and(|p| is_table_row(p));
        let next = lines.get(i + 1).copied().unwrap_or("");
        if starts_table && !is_separator_row(line) && is_table_row(next) && !is_separator_row(next) {
            let columns = line.trim().matches('|').count().saturating_sub(1).max(1);
            out.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_language() {
        assert_eq!(strip_outer_fence("```markdown\n# A\nb\n```"), "# A\nb");
        assert_eq!(strip_outer_fence("```csv\na,b\n1,2\n```\n"), "a,b\n1,2");
        assert_eq!(strip_outer_fence("```\nx\n```"), "x");
    }

    #[test]
    fn inner_fences_survive() {
        let md = "Intro\n```rust\nfn main() {}\n```\nOutro";
        assert_eq!(strip_outer_fence(md), md);
    }

    #[test]
    fn newline_and_invisible() {
        assert_eq!(unify_newlines("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(drop_invisible("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(squeeze_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(squeeze_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn final_newline_rules() {
        assert_eq!(final_newline("x"), "x\n");
        assert_eq!(final_newline("x\n\n"), "x\n");
        assert_eq!(final_newline("  \n"), "\n");
    }

    #[test]
    fn heading_gets_gap() {
        assert_eq!(space_headings("text\n## Head\nmore"), "text\n\n## Head\nmore");
        assert_eq!(space_headings("# Top\nbody"), "# Top\nbody");
        assert_eq!(space_headings("```\ntext\n# comment\n```"), "```\ntext\n# comment\n```");
    }

    #[test]
    fn table_separator_added_once() {
        let fixed = add_table_separator("| A | B |\n| 1 | 2 |\n| 3 | 4 |");
        assert_eq!(fixed, "| A | B |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |");
        let ok = "| A |\n| --- |\n| 1 |";
        assert_eq!(add_table_separator(ok), ok);
    }

    #[test]
    fn markdown_pipeline() {
        let raw = "```markdown\r\n# Title\r\nText   \r\n\r\n\r\n\r\n## Part\u{200B}\r\n```";
        assert_eq!(clean_markdown(raw), "# Title\nText\n\n## Part\n");
    }

    #[test]
    fn csv_pipeline_keeps_table_gap() {
        let raw = "```csv\nname,value\nrent,1200\n\n\n\nitem,qty\npen,3  \n```";
        assert_eq!(clean_csv(raw), "name,value\nrent,1200\n\nitem,qty\npen,3\n");
    }
}
