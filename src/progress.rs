//! Progress-callback trait for run and per-page events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! status lines and page completions while a document is processed.
//!
//! Pages are summarized one at a time, so events arrive in page order and
//! the completed fraction after page `i` is `i / total_pages`.
//!
//! # Example
//!
//! ```rust
//! use pdf_summarizer::{SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, summary_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, summary_len);
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Coarse phases of a run, reported before each begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Input persisted; the PDF is being opened and extracted.
    Extracting,
    /// Extraction finished; per-page summaries are being requested.
    Summarizing,
    /// All summaries collected; the report is being written.
    WritingReport,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::Extracting => f.write_str("Processing the PDF file..."),
            RunStage::Summarizing => {
                f.write_str("Extracting and summarizing text from each page...")
            }
            RunStage::WritingReport => f.write_str("Generating the summary report..."),
        }
    }
}

/// Called by the driver as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called when a run enters a new stage.
    fn on_stage(&self, stage: RunStage) {
        let _ = stage;
    }

    /// Called once extraction is done and the page count is known.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be summarized
    fn on_summary_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the summary request is sent for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's summary has been received.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in this run
    /// * `summary_len` — byte length of the summary text
    fn on_page_complete(&self, page_num: usize, total_pages: usize, summary_len: usize) {
        let _ = (page_num, total_pages, summary_len);
    }

    /// Called when a page's summary request failed.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the report has been written.
    ///
    /// # Arguments
    /// * `total_pages`   — pages in this run
    /// * `success_count` — pages that made it into the report
    fn on_summary_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
#[derive(Debug)]
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
