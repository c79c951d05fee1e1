//! CLI binary for pdf-summarizer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SummaryConfig`, shows progress and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_summarizer::{
    inspect, summarize, FailurePolicy, Pipeline, ProgressCallback, RunStage, SummaryConfig,
    SummaryProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Status lines plus a progress bar that advances once per summarized page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Summarizing");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: RunStage) {
        self.bar.println(format!("{} {}", cyan("◆"), stage));
        if stage == RunStage::WritingReport {
            self.bar.set_message("writing report");
        }
    }

    fn on_summary_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page_num: usize, total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar
            .set_message(format!("Processing page {page_num} of {total}..."));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, summary_len: usize) {
        let elapsed = self.page_elapsed(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{summary_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_summary_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages summarized",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages summarized  ({} failed)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize into summarized_output.pdf
  pdfsum document.pdf

  # Choose the report path
  pdfsum document.pdf -o notes.pdf

  # Text layer only: no OCR, no table detection
  pdfsum --no-ocr --no-tables document.pdf

  # Keep going when a page's summary request fails
  pdfsum --keep-going document.pdf

  # Use another model or provider
  pdfsum --model llama-3.1-8b-instant document.pdf
  pdfsum --provider openai --model gpt-4.1-mini document.pdf

  # Inspect PDF metadata (no API key needed)
  pdfsum --inspect-only document.pdf

ENVIRONMENT VARIABLES:
  GROQ_API_KEY        API key for the default Groq endpoint
  PDFSUM_MODEL        Override model ID
  PDFSUM_PROVIDER     edgequake-llm provider name (openai, anthropic, ollama, ...)
  PDFIUM_LIB_PATH     Path to an existing libpdfium
"#;

/// Summarize a PDF page by page and write the summaries to a PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsum",
    version,
    about = "Summarize a PDF page by page with an LLM",
    long_about = "Extract the text of each page of a PDF (native text, OCR of embedded images \
and detected tables), summarize every page with a chat model and write the summaries to a \
PDF report, one page per summary.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Report path.
    #[arg(
        short,
        long,
        env = "PDFSUM_OUTPUT",
        default_value = "summarized_output.pdf"
    )]
    output: PathBuf,

    /// Chat model ID.
    #[arg(long, env = "PDFSUM_MODEL", default_value = "llama-3.1-70b-versatile")]
    model: String,

    /// edgequake-llm provider name. Without it the OpenAI-compatible
    /// endpoint at --api-base-url is used.
    #[arg(long, env = "PDFSUM_PROVIDER")]
    provider: Option<String>,

    /// API key for --api-base-url.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible API root.
    #[arg(
        long,
        env = "PDFSUM_API_BASE_URL",
        default_value = "https://api.groq.com/openai/v1"
    )]
    api_base_url: String,

    /// Pages read from the start of the document (1–50).
    #[arg(long, env = "PDFSUM_MAX_PAGES", default_value_t = 50,
          value_parser = clap::value_parser!(u16).range(1..=50))]
    max_pages: u16,

    /// Skip OCR of embedded images.
    #[arg(long)]
    no_ocr: bool,

    /// Skip table detection.
    #[arg(long)]
    no_tables: bool,

    /// Tesseract language code.
    #[arg(long, env = "PDFSUM_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Tesseract executable.
    #[arg(long, env = "PDFSUM_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Leave failed pages out of the report instead of aborting.
    #[arg(long)]
    keep_going: bool,

    /// Path to a text file replacing the summary instruction.
    #[arg(long, env = "PDFSUM_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSUM_PASSWORD")]
    password: Option<String>,

    /// Print the run result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no summarization.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSUM_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFSUM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-request LLM timeout in seconds. Provider default when unset.
    #[arg(long, env = "PDFSUM_API_TIMEOUT")]
    api_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs are suppressed while the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress && !cli.inspect_only {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!(
                "Pages:        {} ({} will be summarized)",
                meta.page_count, meta.processed_page_count
            );
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let pipeline = Pipeline::from_config(&config).context("Failed to set up the pipeline")?;
    let output = summarize(&cli.input, &pipeline, &config)
        .await
        .context("Summarization failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_pages,
            stats.processed_pages + stats.failed_pages,
            stats.total_duration_ms,
            bold(&output.report_path.display().to_string()),
        );
        if stats.skipped_pages > 0 {
            eprintln!(
                "   {}",
                dim(&format!(
                    "{} pages beyond the page limit were not read",
                    stats.skipped_pages
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `SummaryConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .output_path(cli.output.clone())
        .model(cli.model.clone())
        .api_base_url(cli.api_base_url.clone())
        .max_pages(usize::from(cli.max_pages))
        .extract_images(!cli.no_ocr)
        .extract_tables(!cli.no_tables)
        .ocr_language(cli.ocr_lang.clone())
        .tesseract_path(cli.tesseract.clone())
        .download_timeout_secs(cli.download_timeout)
        .failure_policy(if cli.keep_going {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        });

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.instruction {
        let instruction = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(instruction);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
