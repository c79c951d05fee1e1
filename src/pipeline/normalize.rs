//! Deterministic text cleanup applied at the two ends of the pipeline.
//!
//! pdfium's text layer uses `\r\n` line endings and sometimes carries
//! zero-width and control characters; completions occasionally do too.
//! Neither stage inspects the meaning of the text, these passes only make
//! the bytes predictable for the page-marker split and the report layout.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cleanup for a page's native text before it enters the combined stream.
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode and stray control characters
pub fn clean_extracted_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    remove_invisible_chars(&s)
}

/// Cleanup for a summary before it is laid out in the report.
///
/// 1. Normalise line endings
/// 2. Strip invisible Unicode and stray control characters
/// 3. Expand tabs to four spaces
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of more than two blank lines
/// 6. Trim leading and trailing blank lines
pub fn clean_report_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = s.replace('\t', "    ");
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible characters ──────────────────────────────────────

static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    let s = input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    );
    RE_CONTROL.replace_all(&s, "").into_owned()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").into_owned()
}
