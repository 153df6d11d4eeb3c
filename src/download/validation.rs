//! Plausibility checks for downloaded PDFs.

use std::path::Path;

use tokio::io::AsyncReadExt;

use super::DownloadError;
use super::constants::{MIN_PDF_BYTES, PDF_MAGIC};

/// Checks that `path` holds something that can be a PDF: at least
/// [`MIN_PDF_BYTES`] long and starting with `%PDF-`.
///
/// # Errors
///
/// Returns [`DownloadError::Validation`] when either check fails and
/// [`DownloadError::Io`] when the file cannot be read.
pub async fn validate_pdf(path: &Path) -> Result<u64, DownloadError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    let size = metadata.len();
    if size < MIN_PDF_BYTES {
        return Err(DownloadError::validation(
            path,
            format!("file is {size} bytes, expected at least {MIN_PDF_BYTES}"),
        ));
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    let mut header = [0_u8; 5];
    file.read_exact(&mut header)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    if !has_pdf_magic(&header) {
        return Err(DownloadError::validation(path, "missing %PDF- header"));
    }

    Ok(size)
}

/// Returns true when `bytes` starts with the PDF magic.
#[must_use]
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}
