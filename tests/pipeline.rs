//! Whole-run tests with in-process collaborators.
//!
//! Pages are fed as already-read `RawPage`s through `summarize_loaded`, so
//! no pdfium library, tesseract binary or API key is needed. The report is
//! read back with lopdf.

use futures::future::BoxFuture;
use image::DynamicImage;
use lopdf::content::Content;
use lopdf::{Document, Object};
use pdf_summarizer::prompts::{NOTHING_TO_SUMMARIZE, SUMMARY_INSTRUCTION};
use pdf_summarizer::{
    summarize_from_bytes, summarize_loaded, CompletionClient, DocumentMetadata, FailurePolicy,
    LoadedDocument, NoOcr, NoTables, OcrEngine, PdfSumError, Pipeline, RawPage, RunStage,
    SummaryConfig, SummaryProgressCallback, Table, TableExtractor,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Replies `Echo: <page text>`; fails on pages whose text contains `FAIL`.
#[derive(Default)]
struct EchoClient {
    prompts: Mutex<Vec<String>>,
}

impl EchoClient {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionClient for EchoClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, PdfSumError>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let page_text = prompt
            .strip_prefix(SUMMARY_INSTRUCTION)
            .unwrap_or(prompt)
            .to_string();
        Box::pin(async move {
            if page_text.contains("FAIL") {
                Err(PdfSumError::LlmApiError {
                    message: "HTTP 500: upstream error".into(),
                })
            } else {
                Ok(format!("Echo: {page_text}"))
            }
        })
    }
}

/// Every image reads as `ocr-<page>`.
struct EchoOcr;

impl OcrEngine for EchoOcr {
    fn recognize<'a>(
        &'a self,
        page: usize,
        _image: &'a DynamicImage,
    ) -> BoxFuture<'a, Result<Vec<String>, PdfSumError>> {
        Box::pin(async move { Ok(vec![format!("ocr-{page}")]) })
    }
}

/// A one-cell table holding the page number, on every page with images.
struct EchoTables;

impl TableExtractor for EchoTables {
    fn extract(&self, page: &RawPage) -> Result<Vec<Table>, PdfSumError> {
        if page.images.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Table::new(vec![vec![format!("t{}", page.page_num)]])])
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl SummaryProgressCallback for RecordingProgress {
    fn on_stage(&self, stage: RunStage) {
        self.events.lock().unwrap().push(format!("stage {stage:?}"));
    }
    fn on_summary_start(&self, total_pages: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("page {page_num}/{total_pages}"));
    }
    fn on_page_complete(&self, page_num: usize, total_pages: usize, _summary_len: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {page_num}/{total_pages}"));
    }
    fn on_page_error(&self, page_num: usize, total_pages: usize, _error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error {page_num}/{total_pages}"));
    }
    fn on_summary_complete(&self, total_pages: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {success_count}/{total_pages}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pdf_summarizer=debug")
        .with_test_writer()
        .try_init();
}

fn loaded(texts: &[&str]) -> LoadedDocument {
    LoadedDocument {
        total_pages: texts.len(),
        pages: texts
            .iter()
            .enumerate()
            .map(|(i, t)| RawPage::with_text(i + 1, *t))
            .collect(),
    }
}

fn config_in(dir: &Path) -> SummaryConfig {
    SummaryConfig::builder()
        .output_path(dir.join("summarized_output.pdf"))
        .build()
        .unwrap()
}

fn text_pipeline(client: Arc<EchoClient>) -> Pipeline {
    Pipeline::new(client, Arc::new(NoOcr), Arc::new(NoTables))
}

/// `Tj` strings of every report page, in page order.
fn report_lines(path: &Path) -> Vec<Vec<String>> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let content = Content::decode(&doc.get_page_content(*id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match &op.operands[0] {
                    Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_pages_end_to_end() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let client = Arc::new(EchoClient::default());

    let out = summarize_loaded(
        &loaded(&["Hello", "World"]),
        DocumentMetadata::default(),
        &text_pipeline(client.clone()),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(out.summaries.len(), 2);
    assert_eq!(out.summaries[0].text, "Echo: Hello");
    assert_eq!(out.summaries[1].text, "Echo: World");
    assert!(out.errors.is_empty());
    assert_eq!(out.report_path, dir.path().join("summarized_output.pdf"));

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], format!("{SUMMARY_INSTRUCTION}Hello"));

    let pages = report_lines(&out.report_path);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0], vec!["Summary of Page 1", "Echo: Hello"]);
    assert_eq!(pages[1], vec!["Summary of Page 2", "Echo: World"]);
    assert_eq!(out.stats.report_pages, 2);
}

#[tokio::test]
async fn ocr_and_tables_reach_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(EchoClient::default());
    let pipeline = Pipeline::new(client.clone(), Arc::new(EchoOcr), Arc::new(EchoTables));

    let doc = LoadedDocument {
        total_pages: 2,
        pages: vec![
            RawPage {
                page_num: 1,
                text: "Body".into(),
                images: vec![DynamicImage::new_rgb8(2, 2), DynamicImage::new_rgb8(2, 2)],
                runs: Vec::new(),
            },
            RawPage::with_text(2, "Plain"),
        ],
    };
    summarize_loaded(
        &doc,
        DocumentMetadata::default(),
        &pipeline,
        &config_in(dir.path()),
    )
    .await
    .unwrap();

    let prompts = client.prompts();
    assert_eq!(
        prompts[0],
        format!("{SUMMARY_INSTRUCTION}Bodyocr-1ocr-1    0\n0  t1")
    );
    assert_eq!(prompts[1], format!("{SUMMARY_INSTRUCTION}Plain"));
}

#[tokio::test]
async fn only_first_fifty_pages_are_summarized() {
    let dir = tempfile::tempdir().unwrap();
    let texts: Vec<String> = (1..=60).map(|i| format!("content of page {i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let client = Arc::new(EchoClient::default());

    let out = summarize_loaded(
        &loaded(&refs),
        DocumentMetadata::default(),
        &text_pipeline(client.clone()),
        &config_in(dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(client.prompts().len(), 50);
    assert_eq!(out.summaries.len(), 50);
    assert_eq!(out.summaries.last().unwrap().page_num, 50);
    assert_eq!(out.stats.skipped_pages, 10);

    let pages = report_lines(&out.report_path);
    assert_eq!(pages.len(), 50);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page[0], format!("Summary of Page {}", i + 1));
    }
}

#[tokio::test]
async fn empty_page_sends_bare_instruction() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(EchoClient::default());

    let out = summarize_loaded(
        &loaded(&["First", "", "Third"]),
        DocumentMetadata::default(),
        &text_pipeline(client.clone()),
        &config_in(dir.path()),
    )
    .await
    .unwrap();

    let prompts = client.prompts();
    assert_eq!(prompts[1], SUMMARY_INSTRUCTION);
    assert!(prompts[1].contains(NOTHING_TO_SUMMARIZE));
    assert_eq!(out.summaries[1].page_num, 2);
    assert_eq!(
        report_lines(&out.report_path)[1],
        vec!["Summary of Page 2", "Echo:"]
    );
}

#[tokio::test]
async fn abort_policy_stops_without_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let client = Arc::new(EchoClient::default());

    let err = summarize_loaded(
        &loaded(&["ok", "FAIL here", "never sent"]),
        DocumentMetadata::default(),
        &text_pipeline(client.clone()),
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PdfSumError::LlmApiError { .. }));
    assert_eq!(client.prompts().len(), 2);
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn skip_policy_leaves_failed_pages_out() {
    let dir = tempfile::tempdir().unwrap();
    let config = SummaryConfig::builder()
        .output_path(dir.path().join("report.pdf"))
        .failure_policy(FailurePolicy::Skip)
        .build()
        .unwrap();

    let out = summarize_loaded(
        &loaded(&["one", "FAIL two", "three"]),
        DocumentMetadata::default(),
        &text_pipeline(Arc::new(EchoClient::default())),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(out.summaries.len(), 2);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].page(), 2);
    assert_eq!(out.stats.failed_pages, 1);

    let headers: Vec<String> = report_lines(&out.report_path)
        .into_iter()
        .map(|p| p[0].clone())
        .collect();
    assert_eq!(headers, vec!["Summary of Page 1", "Summary of Page 3"]);

    assert!(matches!(
        out.into_result(),
        Err(PdfSumError::PartialFailure {
            success: 2,
            failed: 1,
            total: 3
        })
    ));
}

#[tokio::test]
async fn skip_policy_with_every_page_failing() {
    let dir = tempfile::tempdir().unwrap();
    let config = SummaryConfig::builder()
        .output_path(dir.path().join("report.pdf"))
        .failure_policy(FailurePolicy::Skip)
        .build()
        .unwrap();

    let err = summarize_loaded(
        &loaded(&["FAIL", "FAIL"]),
        DocumentMetadata::default(),
        &text_pipeline(Arc::new(EchoClient::default())),
        &config,
    )
    .await
    .unwrap_err();

    match err {
        PdfSumError::AllPagesFailed { total, first_error } => {
            assert_eq!(total, 2);
            assert!(first_error.contains("Page 1"), "got: {first_error}");
        }
        other => panic!("expected AllPagesFailed, got {other:?}"),
    }
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn progress_events_follow_page_order() {
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());
    let config = SummaryConfig::builder()
        .output_path(dir.path().join("out.pdf"))
        .progress_callback(progress.clone())
        .build()
        .unwrap();

    summarize_loaded(
        &loaded(&["a", "b"]),
        DocumentMetadata::default(),
        &text_pipeline(Arc::new(EchoClient::default())),
        &config,
    )
    .await
    .unwrap();

    let events = progress.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "stage Summarizing",
            "start 2",
            "page 1/2",
            "done 1/2",
            "page 2/2",
            "done 2/2",
            "stage WritingReport",
            "complete 2/2",
        ]
    );
}

#[tokio::test]
async fn existing_report_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.output_path, b"stale").unwrap();

    summarize_loaded(
        &loaded(&["fresh"]),
        DocumentMetadata::default(),
        &text_pipeline(Arc::new(EchoClient::default())),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(
        report_lines(&config.output_path),
        vec![vec!["Summary of Page 1", "Echo: fresh"]]
    );
}

#[test]
fn non_pdf_upload_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(EchoClient::default());
    let result = tokio_test::block_on(summarize_from_bytes(
        b"<html>not a pdf</html>",
        &text_pipeline(client.clone()),
        &config_in(dir.path()),
    ));

    assert!(matches!(result, Err(PdfSumError::NotAPdf { .. })));
    assert!(client.prompts().is_empty());
}
