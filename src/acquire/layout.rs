//! On-disk layout of acquired documents.
//!
//! ```text
//! <documents_root>/<sanitized_subject>/answer_key/<name>.pdf
//! <documents_root>/<sanitized_subject>/question_paper/<name>.pdf
//! ```
//!
//! Downloads land in a hidden `.incoming` directory under the subject first and
//! are renamed into a kind directory once classified, so a kind directory only
//! ever holds complete, classified files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::classify::ClassificationLabel;

/// Staging directory name under each subject directory.
pub const INCOMING_DIR: &str = ".incoming";

/// Subject directory name used when sanitization leaves nothing.
pub const UNKNOWN_SUBJECT: &str = "unknown";

/// Filesystem errors while preparing or populating the layout.
#[derive(Debug, Error)]
#[error("layout I/O error at {path}: {source}")]
pub struct LayoutError {
    /// Path being created or moved.
    pub path: PathBuf,
    /// Underlying error.
    #[source]
    pub source: std::io::Error,
}

impl LayoutError {
    fn new(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Maps a subject to its directory name.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`, one for one; a blank
/// subject becomes [`UNKNOWN_SUBJECT`].
#[must_use]
pub fn sanitize_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return UNKNOWN_SUBJECT.to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Upper bound on a document file name, leaving room for the `.part` suffix
/// under the common 255-byte name limit.
pub const MAX_FILE_NAME_BYTES: usize = 250;

/// File name for a document: its display name plus `.pdf`.
///
/// Path separators and control characters are replaced, and a name that already
/// ends in `.pdf` is not suffixed again. Overlong names are cut on a character
/// boundary so the result never exceeds [`MAX_FILE_NAME_BYTES`].
#[must_use]
pub fn document_file_name(display_name: &str) -> String {
    let cleaned: String = display_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();
    let stem = if cleaned.is_empty() { "document" } else { cleaned };

    let (base, extension) =
        if stem.to_ascii_lowercase().ends_with(".pdf") && stem.len() > ".pdf".len() {
            stem.split_at(stem.len() - ".pdf".len())
        } else {
            (stem, ".pdf")
        };
    let base = truncate_on_char_boundary(base, MAX_FILE_NAME_BYTES - extension.len()).trim_end();
    let base = if base.is_empty() { "document" } else { base };

    format!("{base}{extension}")
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Directory tree for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLayout {
    subject_dir: PathBuf,
}

impl SubjectLayout {
    /// Layout for `subject` under `documents_root`. Nothing is created yet.
    #[must_use]
    pub fn new(documents_root: &Path, subject: &str) -> Self {
        Self {
            subject_dir: documents_root.join(sanitize_subject(subject)),
        }
    }

    /// `<documents_root>/<sanitized_subject>`.
    #[must_use]
    pub fn subject_dir(&self) -> &Path {
        &self.subject_dir
    }

    /// Directory holding documents of `kind`.
    #[must_use]
    pub fn kind_dir(&self, kind: ClassificationLabel) -> PathBuf {
        self.subject_dir.join(kind.dir_name())
    }

    /// Final path for `file_name` classified as `kind`.
    #[must_use]
    pub fn destination(&self, kind: ClassificationLabel, file_name: &str) -> PathBuf {
        self.kind_dir(kind).join(file_name)
    }

    /// Where `file_name` is downloaded before classification.
    #[must_use]
    pub fn staging_path(&self, file_name: &str) -> PathBuf {
        self.subject_dir.join(INCOMING_DIR).join(file_name)
    }

    /// Creates the subject, kind and staging directories. Safe to call repeatedly
    /// and from concurrent runs.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when a directory cannot be created.
    pub async fn ensure(&self) -> Result<(), LayoutError> {
        let dirs = ClassificationLabel::ALL
            .iter()
            .map(|kind| self.kind_dir(*kind))
            .chain(std::iter::once(self.subject_dir.join(INCOMING_DIR)));
        for dir in dirs {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| LayoutError::new(&dir, e))?;
        }
        debug!(subject_dir = %self.subject_dir.display(), "layout ready");
        Ok(())
    }

    /// Looks for `file_name` in either kind directory.
    pub async fn existing_placement(
        &self,
        file_name: &str,
    ) -> Option<(ClassificationLabel, PathBuf)> {
        for kind in ClassificationLabel::ALL {
            let path = self.destination(kind, file_name);
            if tokio::fs::metadata(&path)
                .await
                .is_ok_and(|meta| meta.is_file())
            {
                return Some((kind, path));
            }
        }
        None
    }

    /// Moves a classified staging file into its kind directory.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the rename fails.
    pub async fn place(
        &self,
        staged: &Path,
        kind: ClassificationLabel,
        file_name: &str,
    ) -> Result<PathBuf, LayoutError> {
        let destination = self.destination(kind, file_name);
        tokio::fs::rename(staged, &destination)
            .await
            .map_err(|e| LayoutError::new(&destination, e))?;
        Ok(destination)
    }
}
