//! Pipeline stages for PDF summarization.
//!
//! Each submodule implements one step; the driver in [`crate::summarize`]
//! strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdf ──▶ extract ──▶ llm ──▶ report
//! (persist)  (pdfium)  (ocr + tables)  (chat)  (lopdf)
//! ```
//!
//! 1. [`input`]   — persist the upload into a per-run temp directory
//! 2. [`pdf`]     — read text, images and text runs; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`extract`] — OCR images ([`ocr`]), find tables ([`tables`]) and build
//!    the page-marked text stream, then split it back into segments
//! 4. [`llm`]     — one chat completion per segment; the only stage with
//!    network I/O besides URL download
//! 5. [`report`]  — lay the summaries out into a PDF
//!
//! [`normalize`] holds the text cleanup shared by extraction and reporting.

pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod report;
pub mod tables;
