//! Configuration types for PDF summarization runs.
//!
//! All run behaviour is controlled through [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`]. The three collaborators the pipeline calls
//! (completion client, OCR engine, table extractor) are not part of the
//! config; they live in [`crate::summarize::Pipeline`] and are constructed
//! once per process.

use crate::error::PdfSumError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Hard upper bound on pages processed per document.
pub const MAX_PAGES: usize = 50;

/// Default chat model on the Groq endpoint.
pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Fixed report filename offered for download.
pub const DEFAULT_OUTPUT_FILE: &str = "summarized_output.pdf";

/// Configuration for one summarization run.
///
/// # Example
/// ```rust
/// use pdf_summarizer::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .max_pages(10)
///     .model("llama-3.1-8b-instant")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, 10);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Pages processed from the start of the document. Range: 1–50. Default: 50.
    pub max_pages: usize,

    /// Chat model identifier. Default: `llama-3.1-70b-versatile`.
    pub model: String,

    /// `edgequake-llm` provider name (e.g. "openai", "anthropic", "ollama").
    /// When `None` the Groq endpoint at `api_base_url` is used.
    pub provider_name: Option<String>,

    /// Root URL of the OpenAI-compatible chat API. Default: Groq.
    pub api_base_url: String,

    /// API key for `api_base_url`. Usually taken from `GROQ_API_KEY`.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Instruction prepended to every page. If None, uses
    /// [`crate::prompts::SUMMARY_INSTRUCTION`].
    pub instruction: Option<String>,

    /// Run OCR over embedded images. Default: true.
    pub extract_images: bool,

    /// Tesseract language code. Default: "eng".
    pub ocr_language: String,

    /// Path or name of the tesseract executable. Default: "tesseract".
    pub tesseract_path: PathBuf,

    /// Run table extraction. Default: true.
    pub extract_tables: bool,

    /// Thresholds for the layout table finder.
    pub table_settings: TableSettings,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// What to do when a page's summary request fails. Default: abort.
    pub failure_policy: FailurePolicy,

    /// Where the report is written. Default: `summarized_output.pdf`.
    pub output_path: PathBuf,

    /// Report page layout.
    pub report: ReportSettings,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            api_timeout_secs: None,
            instruction: None,
            extract_images: true,
            ocr_language: "eng".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            extract_tables: true,
            table_settings: TableSettings::default(),
            password: None,
            failure_policy: FailurePolicy::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            report: ReportSettings::default(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("max_pages", &self.max_pages)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("extract_images", &self.extract_images)
            .field("ocr_language", &self.ocr_language)
            .field("extract_tables", &self.extract_tables)
            .field("failure_policy", &self.failure_policy)
            .field("output_path", &self.output_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SummaryProgressCallback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummaryConfig`].
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl fmt::Debug for SummaryConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SummaryConfigBuilder {
    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn extract_tables(mut self, v: bool) -> Self {
        self.config.extract_tables = v;
        self
    }

    pub fn table_settings(mut self, settings: TableSettings) -> Self {
        self.config.table_settings = settings;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn report(mut self, settings: ReportSettings) -> Self {
        self.config.report = settings;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, PdfSumError> {
        let c = &self.config;
        if c.max_pages == 0 || c.max_pages > MAX_PAGES {
            return Err(PdfSumError::InvalidConfig(format!(
                "max_pages must be 1–{MAX_PAGES}, got {}",
                c.max_pages
            )));
        }
        if c.model.trim().is_empty() {
            return Err(PdfSumError::InvalidConfig("model must not be empty".into()));
        }
        if c.output_path.as_os_str().is_empty() {
            return Err(PdfSumError::InvalidConfig(
                "output_path must not be empty".into(),
            ));
        }
        c.report.validate()?;
        Ok(self.config)
    }
}

// ── Enums & nested settings ──────────────────────────────────────────────

/// How the driver reacts when a page's summary request fails.
///
/// | Policy | Behaviour |
/// |--------|-----------|
/// | `Abort` | first failure ends the run, no report is written (default) |
/// | `Skip`  | failed pages are left out of the report and listed in `errors` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    #[default]
    Abort,
    Skip,
}

/// Thresholds for [`crate::pipeline::tables::LayoutTableExtractor`].
///
/// All distances are PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Max distance between vertical centres of runs on the same row.
    pub row_tolerance: f32,
    /// Horizontal gap that separates two cells on a row.
    pub column_gap: f32,
    /// Max distance between a cell's left edge and its column anchor.
    pub column_tolerance: f32,
    /// Rows a block needs before it counts as a table.
    pub min_rows: usize,
    /// Cells a row needs before it can belong to a table.
    pub min_columns: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            row_tolerance: 3.0,
            column_gap: 12.0,
            column_tolerance: 8.0,
            min_rows: 2,
            min_columns: 2,
        }
    }
}

/// Page layout of the generated report.
///
/// Defaults mirror a classic A4 text report: Helvetica 12 pt, 10 mm line
/// height, 10 mm side/top margins and a 15 mm bottom margin before a page
/// break.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Page width in points.
    pub page_width: f32,
    /// Page height in points.
    pub page_height: f32,
    /// Left and right margin in points.
    pub side_margin: f32,
    /// Top margin in points.
    pub top_margin: f32,
    /// Bottom margin in points; text stops above it.
    pub bottom_margin: f32,
    /// Font size in points.
    pub font_size: f32,
    /// Distance between baselines in points.
    pub line_height: f32,
}

const MM: f32 = 72.0 / 25.4;

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            page_width: 210.0 * MM,
            page_height: 297.0 * MM,
            side_margin: 10.0 * MM,
            top_margin: 10.0 * MM,
            bottom_margin: 15.0 * MM,
            font_size: 12.0,
            line_height: 10.0 * MM,
        }
    }
}

impl ReportSettings {
    /// Width available to a line of text.
    pub fn text_width(&self) -> f32 {
        self.page_width - 2.0 * self.side_margin
    }

    /// Lines that fit between the top and bottom margins.
    pub fn lines_per_page(&self) -> usize {
        let usable = self.page_height - self.top_margin - self.bottom_margin;
        (usable / self.line_height).floor().max(1.0) as usize
    }

    fn validate(&self) -> Result<(), PdfSumError> {
        if self.font_size <= 0.0 || self.line_height <= 0.0 {
            return Err(PdfSumError::InvalidConfig(
                "report font size and line height must be positive".into(),
            ));
        }
        if self.text_width() <= self.font_size {
            return Err(PdfSumError::InvalidConfig(
                "report margins leave no room for text".into(),
            ));
        }
        if self.page_height - self.top_margin - self.bottom_margin < self.line_height {
            return Err(PdfSumError::InvalidConfig(
                "report margins leave no room for a single line".into(),
            ));
        }
        Ok(())
    }
}
