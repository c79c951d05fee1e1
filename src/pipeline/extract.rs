//! Page text extraction: native text, OCR of embedded images and tables,
//! combined into one marked stream.
//!
//! The combined text is the hand-off format between extraction and
//! summarization. Every processed page contributes
//!
//! ```text
//! \n\nPage {n}\n{native text}{ocr text}{table text}
//! ```
//!
//! and [`split_pages`] recovers the per-page segments by splitting on
//! `"\n\nPage "`. Page content is neutralised on the way in so the split is
//! exact: one segment per processed page, whatever the page says.

use crate::config::SummaryConfig;
use crate::error::PdfSumError;
use crate::pipeline::normalize::clean_extracted_text;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::pdf::{load_pages, LoadOptions, LoadedDocument, RawPage};
use crate::pipeline::tables::TableExtractor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// The separator [`split_pages`] looks for.
pub const PAGE_SPLIT: &str = "\n\nPage ";

/// Marker emitted before page `page_num`'s content.
pub fn page_marker(page_num: usize) -> String {
    format!("{PAGE_SPLIT}{page_num}\n")
}

/// Extracted content of one page, before marking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_num: usize,
    pub native_text: String,
    /// OCR output of all embedded images.
    pub ocr_text: String,
    /// Rendered tables, back to back.
    pub table_text: String,
}

impl PageRecord {
    /// Native text, OCR text and table text, with marker look-alikes defused.
    pub fn content(&self) -> String {
        let joined = format!("{}{}{}", self.native_text, self.ocr_text, self.table_text);
        neutralise_markers(&joined)
    }
}

/// Output of the extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Per-page records, in page order.
    pub records: Vec<PageRecord>,
    /// The marked stream handed to the splitter.
    pub text: String,
}

impl ExtractedDocument {
    /// Pages that made it into `text`.
    pub fn processed_pages(&self) -> usize {
        self.records.len()
    }
}

/// One page's slice of the marked stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSegment {
    /// Page number parsed from the marker line.
    pub page_num: usize,
    /// The page's content with the marker line removed.
    pub text: String,
}

// ── Per page ─────────────────────────────────────────────────────────────────

/// OCR every image on the page and run the table finder.
///
/// Any OCR or table failure is returned as is; there is no partial record.
pub async fn extract_page(
    raw: &RawPage,
    ocr: &dyn OcrEngine,
    tables: &dyn TableExtractor,
) -> Result<PageRecord, PdfSumError> {
    let mut ocr_text = String::new();
    for image in &raw.images {
        let fragments = ocr.recognize(raw.page_num, image).await?;
        ocr_text.push_str(&fragments.join(" "));
    }

    let table_text: String = tables
        .extract(raw)?
        .iter()
        .map(|t| t.to_frame_string())
        .collect();

    debug!(
        "Page {}: {} native chars, {} OCR chars from {} images, {} table chars",
        raw.page_num,
        raw.text.len(),
        ocr_text.len(),
        raw.images.len(),
        table_text.len()
    );

    Ok(PageRecord {
        page_num: raw.page_num,
        native_text: clean_extracted_text(&raw.text),
        ocr_text,
        table_text,
    })
}

/// Concatenate marker and content for every record, in order.
pub fn assemble_marked_text(records: &[PageRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&page_marker(record.page_num));
        out.push_str(&record.content());
    }
    out
}

/// Insert a space wherever content could be mistaken for a marker.
///
/// A marker is `"\n\nPage "`. Content is always preceded by the marker's
/// trailing newline, so a leading `"\nPage "` is defused too.
fn neutralise_markers(content: &str) -> String {
    let mut s = content.replace(PAGE_SPLIT, "\n\n Page ");
    if s.starts_with("\nPage ") {
        s.insert(1, ' ');
    }
    s
}

// ── Per document ─────────────────────────────────────────────────────────────

/// Extract from already-loaded pages, keeping the first `max_pages`.
pub async fn extract_loaded(
    loaded: &LoadedDocument,
    max_pages: usize,
    ocr: &dyn OcrEngine,
    tables: &dyn TableExtractor,
) -> Result<ExtractedDocument, PdfSumError> {
    let mut records = Vec::with_capacity(loaded.pages.len().min(max_pages));
    for raw in loaded.pages.iter().take(max_pages) {
        records.push(extract_page(raw, ocr, tables).await?);
    }
    let text = assemble_marked_text(&records);

    info!(
        "Extracted {} of {} pages ({} chars)",
        records.len(),
        loaded.total_pages,
        text.len()
    );
    Ok(ExtractedDocument {
        total_pages: loaded.total_pages,
        records,
        text,
    })
}

/// Load the PDF at `path` and run the full extraction.
pub async fn extract_document(
    path: &Path,
    ocr: &dyn OcrEngine,
    tables: &dyn TableExtractor,
    config: &SummaryConfig,
) -> Result<ExtractedDocument, PdfSumError> {
    let options = LoadOptions {
        max_pages: config.max_pages,
        password: config.password.clone(),
        images: config.extract_images,
        runs: config.extract_tables,
    };
    let loaded = load_pages(path, &options).await?;
    if loaded.total_pages == 0 {
        return Err(PdfSumError::NoPages {
            path: path.to_path_buf(),
        });
    }
    extract_loaded(&loaded, config.max_pages, ocr, tables).await
}

// ── Splitting ────────────────────────────────────────────────────────────────

/// Split the marked stream back into page segments.
///
/// Anything before the first marker is discarded. Each segment starts with
/// the page number line, which is parsed and removed.
pub fn split_pages(text: &str) -> Result<Vec<PageSegment>, PdfSumError> {
    text.split(PAGE_SPLIT)
        .skip(1)
        .map(|chunk| {
            let (number, body) = chunk.split_once('\n').unwrap_or((chunk, ""));
            let page_num = number.trim().parse::<usize>().map_err(|_| {
                PdfSumError::Internal(format!("malformed page marker: {number:?}"))
            })?;
            Ok(PageSegment {
                page_num,
                text: body.to_string(),
            })
        })
        .collect()
}
