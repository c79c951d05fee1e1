//! # pdf-summarizer
//!
//! Summarize a PDF page by page with a chat model and get the summaries
//! back as a PDF report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    persist the upload (local file, URL or bytes)
//!  ├─ 2. Read     first 50 pages via pdfium (spawn_blocking)
//!  ├─ 3. Extract  native text + OCR of embedded images + tables,
//!  │              joined into one stream with "\n\nPage N\n" markers
//!  ├─ 4. Split    back into one segment per page
//!  ├─ 5. LLM      one chat completion per page, sequentially
//!  └─ 6. Report   one "Summary of Page N" section per page (lopdf)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_summarizer::{summarize, Pipeline, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GROQ_API_KEY from the environment
//!     let config = SummaryConfig::builder()
//!         .output_path("summarized_output.pdf")
//!         .build()?;
//!     let pipeline = Pipeline::from_config(&config)?;
//!     let output = summarize("document.pdf", &pipeline, &config).await?;
//!     eprintln!(
//!         "{} pages summarized → {}",
//!         output.stats.processed_pages,
//!         output.report_path.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsum` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External tools
//!
//! * **pdfium** — loaded at runtime from `PDFIUM_LIB_PATH`, the working
//!   directory or the system library path.
//! * **tesseract** — only needed when image OCR is on (the default).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FailurePolicy, ReportSettings, SummaryConfig, SummaryConfigBuilder, TableSettings,
};
pub use error::{PageError, PdfSumError};
pub use output::{DocumentMetadata, PageSummary, SummaryOutput, SummaryStats};
pub use pipeline::extract::{PageSegment, PAGE_SPLIT};
pub use pipeline::llm::{groq_client, CompletionClient, ProviderClient};
pub use pipeline::ocr::{NoOcr, OcrEngine, TesseractOcr};
pub use pipeline::pdf::{LoadedDocument, RawPage, TextRun};
pub use pipeline::tables::{LayoutTableExtractor, NoTables, Table, TableExtractor};
pub use progress::{NoopProgressCallback, ProgressCallback, RunStage, SummaryProgressCallback};
pub use summarize::{
    inspect, summarize, summarize_from_bytes, summarize_loaded, summarize_sync,
    summarize_to_file, Pipeline,
};
