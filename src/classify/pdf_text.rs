//! First-page text extraction with lopdf.

use std::path::Path;

use lopdf::Document;
use tracing::debug;

use super::ClassifyError;

/// Opens `path` as a PDF and returns the text of its first page.
///
/// A document that opens but whose first page yields no decodable text returns
/// an empty string; scanned papers are common and still classify by name.
///
/// # Errors
///
/// Returns [`ClassifyError::Unreadable`] when the file is not a loadable PDF and
/// [`ClassifyError::NoPages`] when it has no pages at all.
pub fn first_page_text(path: &Path) -> Result<String, ClassifyError> {
    let doc = Document::load(path).map_err(|e| ClassifyError::unreadable(path, e))?;

    let Some(first_page) = doc.get_pages().keys().next().copied() else {
        return Err(ClassifyError::NoPages {
            path: path.to_path_buf(),
        });
    };

    match doc.extract_text(&[first_page]) {
        Ok(text) => Ok(text),
        Err(error) => {
            debug!(path = %path.display(), error = %error, "first page has no extractable text");
            Ok(String::new())
        }
    }
}
