//! PDF reading: native text, embedded images and positioned text runs via pdfium.
//!
//! pdfium objects borrow the document and are not `Send`, so the whole pass
//! runs inside `spawn_blocking` and copies what later stages need into
//! owned [`RawPage`] values. Everything downstream of this module is
//! pdfium-free and can be driven from plain data in tests.

use crate::error::PdfSumError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// A run of text with its bounding box, in PDF points (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl TextRun {
    pub fn new(text: impl Into<String>, left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            bottom,
            top,
        }
    }

    /// Vertical centre of the box.
    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Owned snapshot of one page.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Native text layer.
    pub text: String,
    /// Decoded embedded images, in object order.
    pub images: Vec<DynamicImage>,
    /// Positioned text used by the table finder.
    pub runs: Vec<TextRun>,
}

impl RawPage {
    /// A page with only a text layer.
    pub fn with_text(page_num: usize, text: impl Into<String>) -> Self {
        Self {
            page_num,
            text: text.into(),
            ..Self::default()
        }
    }
}

/// What [`load_pages`] should read for each page.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Pages read from the start of the document.
    pub max_pages: usize,
    pub password: Option<String>,
    /// Decode embedded images for OCR.
    pub images: bool,
    /// Collect positioned text runs for table extraction.
    pub runs: bool,
}

/// Result of a pdfium pass over the document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Pages in the document, before the cap.
    pub total_pages: usize,
    /// The first `min(total_pages, max_pages)` pages, in order.
    pub pages: Vec<RawPage>,
}

/// Bind pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the system library.
pub fn create_pdfium() -> Result<Pdfium, PdfSumError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(|p| Pdfium::bind_to_library(p));

    let bindings = match from_env {
        Some(Ok(bindings)) => Ok(bindings),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PdfSumError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Read the first `max_pages` pages of a PDF.
pub async fn load_pages(
    pdf_path: &Path,
    options: &LoadOptions,
) -> Result<LoadedDocument, PdfSumError> {
    let path = pdf_path.to_path_buf();
    let options = options.clone();

    tokio::task::spawn_blocking(move || load_pages_blocking(&path, &options))
        .await
        .map_err(|e| PdfSumError::Internal(format!("PDF load task panicked: {e}")))?
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PdfSumError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PdfSumError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PdfSumError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PdfSumError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn load_pages_blocking(
    pdf_path: &Path,
    options: &LoadOptions,
) -> Result<LoadedDocument, PdfSumError> {
    let pdfium = create_pdfium()?;
    let document = open_document(&pdfium, pdf_path, options.password.as_deref())?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let limit = total_pages.min(options.max_pages);
    info!("PDF loaded: {} pages, reading {}", total_pages, limit);

    let mut results = Vec::with_capacity(limit);
    for idx in 0..limit {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| PdfSumError::TextExtractionFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;

        let text_layer = page.text().map_err(|e| PdfSumError::TextExtractionFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

        let runs = if options.runs {
            text_layer
                .segments()
                .iter()
                .map(|segment| {
                    let b = segment.bounds();
                    TextRun::new(
                        segment.text(),
                        b.left().value,
                        b.bottom().value,
                        b.right().value,
                        b.top().value,
                    )
                })
                .filter(|run| !run.text.trim().is_empty())
                .collect()
        } else {
            Vec::new()
        };

        let mut images = Vec::new();
        if options.images {
            for object in page.objects().iter() {
                collect_images(&object, page_num, &mut images)?;
            }
        }

        let text = text_layer.all();
        debug!(
            "Read page {}: {} chars, {} images, {} runs",
            page_num,
            text.len(),
            images.len(),
            runs.len()
        );

        results.push(RawPage {
            page_num,
            text,
            images,
            runs,
        });
    }

    Ok(LoadedDocument {
        total_pages,
        pages: results,
    })
}

/// Decode `object` if it is an image, or every image nested inside it if it
/// is a form XObject.
fn collect_images(
    object: &PdfPageObject,
    page_num: usize,
    images: &mut Vec<DynamicImage>,
) -> Result<(), PdfSumError> {
    match object {
        PdfPageObject::Image(image_obj) => {
            let image = image_obj
                .get_raw_image()
                .map_err(|e| PdfSumError::ImageDecodeFailed {
                    page: page_num,
                    image: images.len() + 1,
                    detail: format!("{e:?}"),
                })?;
            images.push(image);
        }
        PdfPageObject::XObjectForm(form) => {
            for index in form.as_range() {
                let child = form
                    .get(index)
                    .map_err(|e| PdfSumError::ImageDecodeFailed {
                        page: page_num,
                        image: images.len() + 1,
                        detail: format!("form object {index}: {e:?}"),
                    })?;
                collect_images(&child, page_num, images)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Read document metadata without touching page content.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    max_pages: usize,
) -> Result<DocumentMetadata, PdfSumError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        extract_metadata_blocking(&path, pwd.as_deref(), max_pages)
    })
    .await
    .map_err(|e| PdfSumError::Internal(format!("Metadata task panicked: {e}")))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    max_pages: usize,
) -> Result<DocumentMetadata, PdfSumError> {
    let pdfium = create_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let page_count = document.pages().len() as usize;

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count,
        processed_page_count: page_count.min(max_pages),
        pdf_version: format!("{:?}", document.version()),
    })
}
