//! Input persistence: copy the uploaded PDF into a per-run directory.
//!
//! Every run gets its own [`TempDir`], so two runs in one process never
//! share an upload path. The directory (and the persisted copy) is removed
//! when the [`RunInput`] is dropped, even if the run fails half-way.
//! Bytes are checked for the `%PDF` magic before anything is written.

use crate::error::PdfSumError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Name of the persisted upload inside the run directory.
const UPLOAD_FILE_NAME: &str = "uploaded_file.pdf";

/// A PDF persisted for the duration of one run.
#[derive(Debug)]
pub struct RunInput {
    path: PathBuf,
    /// Where the bytes came from (path or URL), for logging and reports.
    source: String,
    _run_dir: TempDir,
}

impl RunInput {
    /// Path of the persisted copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original input string.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Fetch the input (local path or URL) and persist it for this run.
pub async fn persist_input(input: &str, timeout_secs: u64) -> Result<RunInput, PdfSumError> {
    if input.trim().is_empty() {
        return Err(PdfSumError::InvalidInput {
            input: input.to_string(),
        });
    }
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    persist_bytes(&bytes, input).await
}

/// Persist in-memory PDF bytes (an upload) for this run.
pub async fn persist_bytes(bytes: &[u8], source: &str) -> Result<RunInput, PdfSumError> {
    check_magic(bytes, Path::new(source))?;

    let run_dir = tempfile::Builder::new()
        .prefix("pdfsum-run-")
        .tempdir()
        .map_err(|e| PdfSumError::Internal(format!("Failed to create run directory: {e}")))?;
    let path = run_dir.path().join(UPLOAD_FILE_NAME);

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| PdfSumError::Internal(format!("Failed to persist upload: {e}")))?;

    debug!("Persisted {} bytes to {}", bytes.len(), path.display());
    Ok(RunInput {
        path,
        source: source.to_string(),
        _run_dir: run_dir,
    })
}

/// Verify PDF magic bytes.
fn check_magic(bytes: &[u8], origin: &Path) -> Result<(), PdfSumError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(PdfSumError::NotAPdf {
            path: origin.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Read a local file, mapping I/O failures onto input errors.
async fn read_local(path_str: &str) -> Result<Vec<u8>, PdfSumError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PdfSumError::PermissionDenied { path })
        }
        Err(_) => Err(PdfSumError::FileNotFound { path }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, PdfSumError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PdfSumError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PdfSumError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PdfSumError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PdfSumError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PdfSumError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn rejects_non_pdf_bytes() {
        let err = persist_bytes(b"PK\x03\x04zip", "upload.zip")
            .await
            .unwrap_err();
        match err {
            PdfSumError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_truncated_bytes() {
        assert!(matches!(
            persist_bytes(b"%P", "tiny.pdf").await,
            Err(PdfSumError::NotAPdf { .. })
        ));
    }

    #[tokio::test]
    async fn each_run_gets_its_own_path_and_cleans_up() {
        let a = persist_bytes(b"%PDF-1.4 a", "a.pdf").await.unwrap();
        let b = persist_bytes(b"%PDF-1.4 b", "b.pdf").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"%PDF-1.4 a");
        assert_eq!(a.source(), "a.pdf");

        let kept = a.path().to_path_buf();
        drop(a);
        assert!(!kept.exists(), "run directory should be removed on drop");
    }

    #[tokio::test]
    async fn missing_local_file_is_reported() {
        let err = persist_input("/definitely/not/here.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfSumError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_is_copied_into_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.pdf");
        std::fs::write(&src, b"%PDF-1.7\n").unwrap();

        let run = persist_input(src.to_str().unwrap(), 5).await.unwrap();
        assert_ne!(run.path(), src.as_path());
        assert_eq!(std::fs::read(run.path()).unwrap(), b"%PDF-1.7\n");
    }
}
