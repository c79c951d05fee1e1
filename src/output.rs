//! Result types returned by a summarization run.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document-level metadata read before extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    /// Pages in the document.
    pub page_count: usize,
    /// Pages that will be processed (`min(page_count, max_pages)`).
    pub processed_page_count: usize,
    pub pdf_version: String,
}

/// One page's summary as placed in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number of the source page.
    pub page_num: usize,
    /// Completion text, verbatim.
    pub text: String,
    /// Wall-clock time of the request.
    pub duration_ms: u64,
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages that were summarized successfully.
    pub processed_pages: usize,
    /// Pages whose summary failed (skip policy only).
    pub failed_pages: usize,
    /// Pages beyond the page cap that were never read.
    pub skipped_pages: usize,
    /// Characters of combined extracted text.
    pub extracted_chars: usize,
    /// Pages in the written report.
    pub report_pages: usize,
    pub total_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    /// Summaries in page order.
    pub summaries: Vec<PageSummary>,
    /// Pages that failed under [`crate::config::FailurePolicy::Skip`].
    pub errors: Vec<PageError>,
    pub metadata: DocumentMetadata,
    /// Where the report PDF was written.
    pub report_path: PathBuf,
    pub stats: SummaryStats,
}

impl SummaryOutput {
    /// Treat any skipped page as a failure.
    pub fn into_result(self) -> Result<Self, crate::error::PdfSumError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(crate::error::PdfSumError::PartialFailure {
                success: self.summaries.len(),
                failed: self.errors.len(),
                total: self.summaries.len() + self.errors.len(),
            })
        }
    }
}
