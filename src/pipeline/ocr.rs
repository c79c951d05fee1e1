//! OCR of embedded images.
//!
//! [`OcrEngine`] is the seam the extractor calls once per image. The default
//! engine shells out to the `tesseract` CLI: the image is encoded as PNG into
//! a temp file and `tesseract <png> stdout -l <lang>` prints the recognised
//! text. Each non-empty output line is one fragment; the extractor joins
//! fragments with a single space.

use crate::error::PdfSumError;
use futures::future::BoxFuture;
use image::DynamicImage;
use std::io::Cursor;
use std::io::Write as _;
use std::path::PathBuf;
use tracing::debug;

/// Recognises text in a raster image.
pub trait OcrEngine: Send + Sync {
    /// Text fragments found in `image`, in reading order. An image with no
    /// text yields an empty list.
    fn recognize<'a>(
        &'a self,
        page: usize,
        image: &'a DynamicImage,
    ) -> BoxFuture<'a, Result<Vec<String>, PdfSumError>>;
}

/// Encode an image as lossless PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    async fn run(&self, page: usize, image: &DynamicImage) -> Result<Vec<String>, PdfSumError> {
        let ocr_err = |detail: String| PdfSumError::OcrFailed { page, detail };

        let png = encode_png(image).map_err(|e| ocr_err(format!("PNG encode: {e}")))?;
        let mut file = tempfile::Builder::new()
            .prefix("pdfsum-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ocr_err(format!("temp file: {e}")))?;
        file.write_all(&png)
            .and_then(|_| file.flush())
            .map_err(|e| ocr_err(format!("temp file: {e}")))?;

        let output = tokio::process::Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ocr_err(format!(
                        "'{}' not found; install tesseract-ocr or pass --no-ocr",
                        self.binary.display()
                    ))
                } else {
                    ocr_err(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ocr_err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let fragments = parse_fragments(&String::from_utf8_lossy(&output.stdout));
        debug!("Page {}: OCR found {} fragments", page, fragments.len());
        Ok(fragments)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize<'a>(
        &'a self,
        page: usize,
        image: &'a DynamicImage,
    ) -> BoxFuture<'a, Result<Vec<String>, PdfSumError>> {
        Box::pin(self.run(page, image))
    }
}

/// An engine that never finds text. Used when image OCR is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize<'a>(
        &'a self,
        _page: usize,
        _image: &'a DynamicImage,
    ) -> BoxFuture<'a, Result<Vec<String>, PdfSumError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Split tesseract's stdout into fragments: trimmed, non-empty lines.
fn parse_fragments(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
