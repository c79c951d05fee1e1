//! Run entry points: PDF in, summary report out.
//!
//! A run persists the input, reads the first `max_pages` pages, extracts
//! their text into the marked stream, splits it back into page segments,
//! summarizes the segments one at a time and writes the report.

use crate::config::{FailurePolicy, SummaryConfig};
use crate::error::PdfSumError;
use crate::output::{DocumentMetadata, PageSummary, SummaryOutput, SummaryStats};
use crate::pipeline::extract::{extract_document, extract_loaded, split_pages, ExtractedDocument};
use crate::pipeline::input::{self, RunInput};
use crate::pipeline::llm::{client_from_config, summarize_page, CompletionClient};
use crate::pipeline::ocr::{NoOcr, OcrEngine, TesseractOcr};
use crate::pipeline::pdf::{self, LoadedDocument};
use crate::pipeline::report::write_report;
use crate::pipeline::tables::{LayoutTableExtractor, NoTables, TableExtractor};
use crate::progress::RunStage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The three collaborators a run calls out to.
///
/// Built once and shared across runs; nothing in here is per-run state.
#[derive(Clone)]
pub struct Pipeline {
    pub client: Arc<dyn CompletionClient>,
    pub ocr: Arc<dyn OcrEngine>,
    pub tables: Arc<dyn TableExtractor>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        ocr: Arc<dyn OcrEngine>,
        tables: Arc<dyn TableExtractor>,
    ) -> Self {
        Self {
            client,
            ocr,
            tables,
        }
    }

    /// Default collaborators for `config`: the configured completion client,
    /// tesseract OCR and the layout table finder, each replaced by a no-op
    /// when its stage is turned off.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, PdfSumError> {
        let client = client_from_config(config)?;
        let ocr: Arc<dyn OcrEngine> = if config.extract_images {
            Arc::new(TesseractOcr::new(
                config.tesseract_path.clone(),
                config.ocr_language.clone(),
            ))
        } else {
            Arc::new(NoOcr)
        };
        let tables: Arc<dyn TableExtractor> = if config.extract_tables {
            Arc::new(LayoutTableExtractor::new(config.table_settings))
        } else {
            Arc::new(NoTables)
        };
        Ok(Self::new(client, ocr, tables))
    }
}

/// Summarize a PDF file or URL and write the report to `config.output_path`.
///
/// # Errors
/// Input, PDF and extraction failures are always fatal. A failed summary
/// request is fatal under [`FailurePolicy::Abort`]; under
/// [`FailurePolicy::Skip`] the run only fails if every page fails.
pub async fn summarize(
    input_str: impl AsRef<str>,
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryOutput, PdfSumError> {
    let input_str = input_str.as_ref();
    info!("Starting summary run: {}", input_str);

    // ── Step 1: Persist input ────────────────────────────────────────────
    let run = input::persist_input(input_str, config.download_timeout_secs).await?;
    summarize_persisted(run, pipeline, config).await
}

/// Summarize PDF bytes held in memory (an upload).
pub async fn summarize_from_bytes(
    bytes: &[u8],
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryOutput, PdfSumError> {
    let run = input::persist_bytes(bytes, "<upload>").await?;
    summarize_persisted(run, pipeline, config).await
}

/// Summarize and write the report to `output_path` instead of the
/// configured path.
pub async fn summarize_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryStats, PdfSumError> {
    let mut config = config.clone();
    config.output_path = output_path.as_ref().to_path_buf();
    Ok(summarize(input_str, pipeline, &config).await?.stats)
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input_str: impl AsRef<str>,
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryOutput, PdfSumError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfSumError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(input_str, pipeline, config))
}

/// Read PDF metadata and page count without extracting or summarizing.
///
/// Needs neither an API key nor an OCR engine.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<DocumentMetadata, PdfSumError> {
    let run = input::persist_input(input_str.as_ref(), config.download_timeout_secs).await?;
    pdf::extract_metadata(run.path(), config.password.as_deref(), config.max_pages).await
}

async fn summarize_persisted(
    run: RunInput,
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryOutput, PdfSumError> {
    let total_start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(RunStage::Extracting);
    }

    // ── Step 2: Page count ───────────────────────────────────────────────
    let metadata =
        pdf::extract_metadata(run.path(), config.password.as_deref(), config.max_pages).await?;
    info!(
        "{}: {} pages, processing {}",
        run.source(),
        metadata.page_count,
        metadata.processed_page_count
    );

    // ── Step 3: Read pages and extract ───────────────────────────────────
    let extract_start = Instant::now();
    let extracted = extract_document(
        run.path(),
        pipeline.ocr.as_ref(),
        pipeline.tables.as_ref(),
        config,
    )
    .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let mut output =
        summarize_extracted(extracted, extract_duration_ms, metadata, pipeline, config).await?;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Everything after the pdfium pass: extraction, splitting, per-page
/// summaries and the report.
///
/// Takes pages that were already read, so it runs without a pdfium library.
pub async fn summarize_loaded(
    loaded: &LoadedDocument,
    metadata: DocumentMetadata,
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryOutput, PdfSumError> {
    let total_start = Instant::now();

    // ── Step 3: Extract ──────────────────────────────────────────────────
    let extracted = extract_loaded(
        loaded,
        config.max_pages,
        pipeline.ocr.as_ref(),
        pipeline.tables.as_ref(),
    )
    .await?;
    let extract_duration_ms = total_start.elapsed().as_millis() as u64;

    let mut output =
        summarize_extracted(extracted, extract_duration_ms, metadata, pipeline, config).await?;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Split, summarize page by page and write the report.
async fn summarize_extracted(
    extracted: ExtractedDocument,
    extract_duration_ms: u64,
    metadata: DocumentMetadata,
    pipeline: &Pipeline,
    config: &SummaryConfig,
) -> Result<SummaryOutput, PdfSumError> {
    let cb = config.progress_callback.as_ref();

    // ── Step 4: Split into page segments ─────────────────────────────────
    let segments = split_pages(&extracted.text)?;
    if segments.len() != extracted.processed_pages() {
        return Err(PdfSumError::SegmentCountMismatch {
            expected: extracted.processed_pages(),
            found: segments.len(),
        });
    }
    let total = segments.len();
    if total == 0 {
        return Err(PdfSumError::NoPages {
            path: PathBuf::from("<loaded pages>"),
        });
    }

    // ── Step 5: Summarize, one page at a time ────────────────────────────
    if let Some(cb) = cb {
        cb.on_stage(RunStage::Summarizing);
        cb.on_summary_start(total);
    }
    let llm_start = Instant::now();
    let mut summaries: Vec<PageSummary> = Vec::with_capacity(total);
    let mut errors = Vec::new();

    for segment in &segments {
        let page_num = segment.page_num;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total);
        }
        debug!("Page {}/{}: {} chars", page_num, total, segment.text.len());

        match summarize_page(pipeline.client.as_ref(), page_num, &segment.text, config).await {
            Ok(summary) => {
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, total, summary.text.len());
                }
                summaries.push(summary);
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                match config.failure_policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Skip => {
                        warn!("Page {}: summary failed, skipping: {}", page_num, e);
                        errors.push(e.into_page_error(page_num));
                    }
                }
            }
        }
    }
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    if summaries.is_empty() {
        let first_error = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(PdfSumError::AllPagesFailed { total, first_error });
    }

    // ── Step 6: Write report ─────────────────────────────────────────────
    if let Some(cb) = cb {
        cb.on_stage(RunStage::WritingReport);
    }
    let report = write_report(&summaries, &config.output_path, &config.report).await?;

    let stats = SummaryStats {
        total_pages: extracted.total_pages,
        processed_pages: summaries.len(),
        failed_pages: errors.len(),
        skipped_pages: extracted
            .total_pages
            .saturating_sub(extracted.processed_pages()),
        extracted_chars: extracted.text.chars().count(),
        report_pages: report.pages,
        total_duration_ms: 0,
        extract_duration_ms,
        llm_duration_ms,
    };

    info!(
        "Summary complete: {}/{} pages, report at {}",
        summaries.len(),
        total,
        report.path.display()
    );
    if let Some(cb) = cb {
        cb.on_summary_complete(total, summaries.len());
    }

    Ok(SummaryOutput {
        summaries,
        errors,
        metadata,
        report_path: report.path,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdf::RawPage;
    use futures::future::BoxFuture;

    struct EchoClient;

    impl CompletionClient for EchoClient {
        fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, PdfSumError>> {
            Box::pin(async move { Ok(format!("echo:{}", prompt.len())) })
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Arc::new(EchoClient), Arc::new(NoOcr), Arc::new(NoTables))
    }

    #[test]
    fn from_config_without_key_fails_cleanly() {
        if std::env::var(crate::pipeline::llm::GROQ_API_KEY_ENV).is_ok() {
            return;
        }
        let config = SummaryConfig::default();
        let err = Pipeline::from_config(&config).unwrap_err();
        assert!(matches!(err, PdfSumError::ProviderNotConfigured { .. }));
    }

    #[tokio::test]
    async fn document_without_pages_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = SummaryConfig::builder()
            .output_path(dir.path().join("out.pdf"))
            .build()
            .unwrap();
        let loaded = LoadedDocument {
            total_pages: 0,
            pages: Vec::new(),
        };
        let err = summarize_loaded(&loaded, DocumentMetadata::default(), &pipeline(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfSumError::NoPages { .. }));
        assert!(!dir.path().join("out.pdf").exists());
    }

    #[tokio::test]
    async fn stats_count_pages_beyond_cap_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = SummaryConfig::builder()
            .max_pages(2)
            .output_path(dir.path().join("out.pdf"))
            .build()
            .unwrap();
        let loaded = LoadedDocument {
            total_pages: 5,
            pages: (1..=5).map(|i| RawPage::with_text(i, "text")).collect(),
        };
        let out = summarize_loaded(&loaded, DocumentMetadata::default(), &pipeline(), &config)
            .await
            .unwrap();
        assert_eq!(out.stats.total_pages, 5);
        assert_eq!(out.stats.processed_pages, 2);
        assert_eq!(out.stats.skipped_pages, 3);
        assert_eq!(out.stats.report_pages, 2);
    }

    #[tokio::test]
    async fn summarize_to_file_rejects_non_pdf_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, b"just text").unwrap();
        let target = dir.path().join("report.pdf");

        let err = summarize_to_file(
            input.to_str().unwrap(),
            &target,
            &pipeline(),
            &SummaryConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PdfSumError::NotAPdf { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn summarize_sync_runs_without_an_outer_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let config = SummaryConfig::builder()
            .output_path(dir.path().join("out.pdf"))
            .build()
            .unwrap();
        let missing = dir.path().join("missing.pdf");

        let result = summarize_sync(missing.to_str().unwrap(), &pipeline(), &config);
        assert!(matches!(result, Err(PdfSumError::FileNotFound { .. })));
    }
}
