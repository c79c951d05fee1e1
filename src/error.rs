//! Error types for the pdf-summarizer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfSumError`] — **Fatal**: the run cannot produce a report (bad input
//!   file, OCR engine missing, API key rejected). Returned as
//!   `Err(PdfSumError)` from the top-level `summarize*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be summarized.
//!   Only produced under [`crate::config::FailurePolicy::Skip`]; stored in
//!   [`crate::output::SummaryOutput::errors`] so callers can see which pages
//!   are missing from a partial report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-summarizer library.
#[derive(Debug, Error)]
pub enum PdfSumError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The upload exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document has no pages to process.
    #[error("PDF '{path}' has no pages")]
    NoPages { path: PathBuf },

    /// pdfium could not read a page's text layer.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// An embedded image could not be decoded.
    #[error("Embedded image {image} on page {page} could not be decoded: {detail}")]
    ImageDecodeFailed {
        page: usize,
        image: usize,
        detail: String,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The OCR engine failed on an embedded image.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The table finder failed on a page.
    #[error("Table extraction failed on page {page}: {detail}")]
    TableExtractionFailed { page: usize, detail: String },

    /// Splitting the extracted text did not recover one segment per page.
    #[error("Extracted text split into {found} page segments, expected {expected}")]
    SegmentCountMismatch { expected: usize, found: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// The API rejected the credentials (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The completion came back with no text.
    #[error("Model '{model}' returned no completion")]
    EmptyCompletion { model: String },

    /// Some pages were summarized but at least one failed.
    ///
    /// Returned by [`crate::output::SummaryOutput::into_result`] when the
    /// caller wants to treat any skipped page as an error.
    #[error("{failed}/{total} pages failed to summarize")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    /// Every page failed under the skip policy; there is nothing to report.
    #[error("All {total} pages failed to summarize.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// lopdf could not assemble or serialise the report.
    #[error("Failed to build summary report: {0}")]
    ReportBuildFailed(String),

    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfSumError {
    /// Attach a page number to an LLM failure for the per-page error record.
    pub fn into_page_error(self, page: usize) -> PageError {
        PageError::SummaryFailed {
            page,
            detail: self.to_string(),
        }
    }
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The summary request for this page failed.
    #[error("Page {page}: summary failed: {detail}")]
    SummaryFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::SummaryFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_mismatch_display() {
        let e = PdfSumError::SegmentCountMismatch {
            expected: 3,
            found: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("4 page segments"), "got: {msg}");
        assert!(msg.contains("expected 3"), "got: {msg}");
    }

    #[test]
    fn rate_limit_display() {
        let e = PdfSumError::RateLimitExceeded {
            provider: "groq".into(),
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("groq"));
    }

    #[test]
    fn auth_error_display() {
        let e = PdfSumError::AuthError {
            provider: "groq".into(),
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("groq"));
        assert!(e.to_string().contains("invalid key"));
    }

    #[test]
    fn page_error_keeps_page_number() {
        let e = PdfSumError::LlmApiError {
            message: "boom".into(),
        }
        .into_page_error(7);
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("Page 7"));
        assert!(e.to_string().contains("boom"));
    }
}
