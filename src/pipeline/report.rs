//! Report rendering: per-page summaries → a plain text PDF.
//!
//! Each summary starts on a fresh page headed `Summary of Page N`, followed
//! by a blank line and the summary text. Text uses the standard Helvetica
//! font with WinAnsiEncoding, so every character is one byte; anything the
//! encoding cannot represent is written as `?`. A summary longer than one
//! page continues on the next page before the following summary begins.

use crate::config::ReportSettings;
use crate::error::PdfSumError;
use crate::output::PageSummary;
use crate::pipeline::normalize::clean_report_text;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportInfo {
    pub path: PathBuf,
    /// Summaries rendered.
    pub sections: usize,
    /// PDF pages written; greater than `sections` when a summary overflows.
    pub pages: usize,
}

/// Header line for a summary section.
pub fn section_header(page_num: usize) -> String {
    format!("Summary of Page {page_num}")
}

// ── Encoding & metrics ───────────────────────────────────────────────────────

/// Map a character to its WinAnsiEncoding byte.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => {
            let byte = match c {
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8A,
                '‹' => 0x8B,
                'Œ' => 0x8C,
                'Ž' => 0x8E,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9A,
                '›' => 0x9B,
                'œ' => 0x9C,
                'ž' => 0x9E,
                'Ÿ' => 0x9F,
                _ => return None,
            };
            Some(byte)
        }
    }
}

/// Encode a line for a WinAnsi `Tj` operand; unmapped characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Width used for bytes outside printable ASCII.
const HELVETICA_FALLBACK: u16 = 556;

fn char_width(c: char) -> u16 {
    match win_ansi_byte(c).unwrap_or(b'?') {
        b @ 0x20..=0x7E => HELVETICA_ASCII[(b - 0x20) as usize],
        _ => HELVETICA_FALLBACK,
    }
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    units as f32 * font_size / 1000.0
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Greedy word wrap of one paragraph. Words wider than a line are broken
/// between characters.
///
/// Leading spaces are kept as a hanging indent on every wrapped line.
fn wrap_paragraph(paragraph: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let body = paragraph.trim_start_matches(' ');
    if body.is_empty() {
        return vec![String::new()];
    }
    let mut indent = paragraph[..paragraph.len() - body.len()].to_string();
    if text_width(&indent, font_size) > max_width / 2.0 {
        indent.clear();
    }

    let mut lines = Vec::new();
    let mut current = indent.clone();
    for word in body.split(' ') {
        let at_start = current.len() == indent.len();
        let candidate = if at_start {
            format!("{current}{word}")
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !at_start {
            lines.push(std::mem::replace(&mut current, indent.clone()));
        }
        for c in word.chars() {
            let mut next = current.clone();
            next.push(c);
            if text_width(&next, font_size) > max_width && current.len() > indent.len() {
                lines.push(std::mem::replace(&mut current, indent.clone()));
                current.push(c);
            } else {
                current = next;
            }
        }
    }
    lines.push(current);
    lines
}

/// Lay out one section and cut it into pages of lines.
///
/// The first page starts with `header` and a blank line.
pub fn layout_section(header: &str, body: &str, settings: &ReportSettings) -> Vec<Vec<String>> {
    let width = settings.text_width();
    let mut lines = wrap_paragraph(header, width, settings.font_size);
    lines.push(String::new());
    if !body.is_empty() {
        for paragraph in body.split('\n') {
            lines.extend(wrap_paragraph(paragraph, width, settings.font_size));
        }
    }

    lines
        .chunks(settings.lines_per_page())
        .map(<[String]>::to_vec)
        .collect()
}

// ── PDF assembly ─────────────────────────────────────────────────────────────

fn page_content(lines: &[String], settings: &ReportSettings) -> Result<Vec<u8>, PdfSumError> {
    let first_baseline = settings.page_height
        - settings.top_margin
        - 0.5 * settings.line_height
        - 0.3 * settings.font_size;

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Real(settings.font_size)]),
        Operation::new(
            "Td",
            vec![
                Object::Real(settings.side_margin),
                Object::Real(first_baseline),
            ],
        ),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new(
                "Td",
                vec![0.into(), Object::Real(-settings.line_height)],
            ));
        }
        if !line.is_empty() {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_win_ansi(line))],
            ));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| PdfSumError::ReportBuildFailed(format!("content stream: {e}")))
}

/// Assemble the report document in memory.
pub fn build_report(
    summaries: &[PageSummary],
    settings: &ReportSettings,
) -> Result<Document, PdfSumError> {
    if summaries.is_empty() {
        return Err(PdfSumError::ReportBuildFailed(
            "no summaries to render".into(),
        ));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for summary in summaries {
        let body = clean_report_text(&summary.text);
        let pages = layout_section(&section_header(summary.page_num), &body, settings);
        debug!(
            "Summary of page {}: {} report pages",
            summary.page_num,
            pages.len()
        );
        for lines in pages {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                page_content(&lines, settings)?,
            ));
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }
    }

    let count = kids.len() as i64;
    let pages = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
        ("Resources", Object::Reference(resources_id)),
        (
            "MediaBox",
            Object::Array(vec![
                0.into(),
                0.into(),
                Object::Real(settings.page_width),
                Object::Real(settings.page_height),
            ]),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    let info_id = doc.add_object(Dictionary::from_iter([
        ("Title", Object::string_literal("PDF Summary")),
        ("Producer", Object::string_literal("pdf-summarizer")),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));

    Ok(doc)
}

/// Render the report and write it to `path`, replacing any existing file.
///
/// The bytes go to a uniquely named sibling temp file that is then persisted
/// over `path`, so a failed run never leaves a truncated report behind and
/// concurrent runs targeting the same path never share a temp file.
pub async fn write_report(
    summaries: &[PageSummary],
    path: &Path,
    settings: &ReportSettings,
) -> Result<ReportInfo, PdfSumError> {
    let mut doc = build_report(summaries, settings)?;
    let pages = doc.get_pages().len();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfSumError::ReportBuildFailed(format!("serialise: {e}")))?;
    let size = bytes.len();

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist_report(&target, &bytes))
        .await
        .map_err(|e| PdfSumError::Internal(format!("report write task panicked: {e}")))??;

    info!(
        "Report written: {} ({} sections, {} pages, {} bytes)",
        path.display(),
        summaries.len(),
        pages,
        size
    );
    Ok(ReportInfo {
        path: path.to_path_buf(),
        sections: summaries.len(),
        pages,
    })
}

fn persist_report(path: &Path, bytes: &[u8]) -> Result<(), PdfSumError> {
    let write_err = |e: std::io::Error| PdfSumError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(page_num: usize, text: &str) -> PageSummary {
        PageSummary {
            page_num,
            text: text.to_string(),
            duration_ms: 0,
        }
    }

    /// Concatenated `Tj` operands of one report page.
    fn page_strings(doc: &Document, page_id: lopdf::ObjectId) -> Vec<Vec<u8>> {
        let raw = doc.get_page_content(page_id).unwrap();
        let content = Content::decode(&raw).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match &op.operands[0] {
                Object::String(bytes, _) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn win_ansi_mapping() {
        assert_eq!(
            encode_win_ansi("Café – “ok” €5"),
            b"Caf\xe9 \x96 \x93ok\x94 \x805".to_vec()
        );
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
        assert_eq!(win_ansi_byte('\u{81}'), None);
    }

    #[test]
    fn helvetica_widths() {
        assert_eq!(text_width(" ", 1000.0), 278.0);
        assert_eq!(text_width("W", 1000.0), 944.0);
        assert_eq!(text_width("~", 1000.0), 584.0);
        assert!((text_width("Hello", 12.0) - 2.278 * 12.0).abs() < 0.001);
    }

    #[test]
    fn wrap_respects_width_and_keeps_words() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_paragraph(text.trim_end(), 200.0, 12.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 12.0) <= 200.0, "too wide: {line:?}");
        }
        assert_eq!(lines.join(" "), text.trim_end());
    }

    #[test]
    fn wrap_breaks_overlong_word() {
        let lines = wrap_paragraph(&"x".repeat(100), 50.0, 12.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "x".repeat(100));
    }

    #[test]
    fn wrap_keeps_leading_indent() {
        assert_eq!(
            wrap_paragraph("  - term: meaning", 500.0, 12.0),
            vec!["  - term: meaning"]
        );

        let text = format!("    {}", "word ".repeat(40).trim_end());
        let lines = wrap_paragraph(&text, 200.0, 12.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.starts_with("    w"), "lost indent: {line:?}");
            assert!(text_width(line, 12.0) <= 200.0);
        }
    }

    #[test]
    fn section_keeps_glossary_indentation() {
        let pages = layout_section(
            "Summary of Page 1",
            "Difficult terms:\n  - Osmosis: movement of water",
            &ReportSettings::default(),
        );
        assert_eq!(pages[0][3], "  - Osmosis: movement of water");
    }

    #[test]
    fn section_starts_with_header_and_blank_line() {
        let pages = layout_section(
            "Summary of Page 3",
            "First\nSecond",
            &ReportSettings::default(),
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0], vec!["Summary of Page 3", "", "First", "Second"]);
    }

    #[test]
    fn long_section_continues_on_next_page() {
        let settings = ReportSettings::default();
        let body = vec!["line"; 60].join("\n");
        let pages = layout_section("Summary of Page 1", &body, &settings);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.len() <= settings.lines_per_page()));
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 62);
    }

    #[test]
    fn one_page_per_summary_in_order() {
        let doc = build_report(
            &[summary(1, "Alpha"), summary(2, "Beta"), summary(5, "Gamma")],
            &ReportSettings::default(),
        )
        .unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let headers: Vec<Vec<u8>> = pages
            .values()
            .map(|id| page_strings(&doc, *id)[0].clone())
            .collect();
        assert_eq!(
            headers,
            vec![
                b"Summary of Page 1".to_vec(),
                b"Summary of Page 2".to_vec(),
                b"Summary of Page 5".to_vec(),
            ]
        );
        let first = pages.values().next().unwrap();
        assert_eq!(page_strings(&doc, *first)[1], b"Alpha".to_vec());
    }

    #[test]
    fn empty_summary_list_is_an_error() {
        assert!(matches!(
            build_report(&[], &ReportSettings::default()),
            Err(PdfSumError::ReportBuildFailed(_))
        ));
    }

    #[tokio::test]
    async fn write_report_overwrites_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("summarized_output.pdf");

        write_report(&[summary(1, "old")], &path, &ReportSettings::default())
            .await
            .unwrap();
        let info = write_report(
            &[summary(1, "new one"), summary(2, "new two")],
            &path,
            &ReportSettings::default(),
        )
        .await
        .unwrap();

        assert_eq!(info.sections, 2);
        assert_eq!(info.pages, 2);
        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(
            entries,
            vec![std::ffi::OsString::from("summarized_output.pdf")]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summarized_output.pdf");

        for _ in 0..10 {
            let handles: Vec<_> = (1..=8)
                .map(|n| {
                    let path = path.clone();
                    tokio::spawn(async move {
                        let text = format!("run {n}");
                        write_report(&[summary(n, &text)], &path, &ReportSettings::default())
                            .await
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        }

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
