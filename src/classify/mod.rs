//! Answer-key vs question-paper classification.
//!
//! [`classify`] is the pure decision: a document is an answer key when any
//! lexicon phrase appears in its file name or in its first page's text.
//! [`classify_file`] opens a downloaded PDF first; a file that cannot be opened
//! is reported as an error and never defaults to [`ClassificationLabel::QuestionPaper`].

mod lexicon;
mod pdf_text;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

pub use lexicon::{find_marker, marker_labels};
pub use pdf_text::first_page_text;

/// Kind of an acquired document. Encoded on disk as the kind directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    /// Mark schemes, answer keys, examiner reports.
    AnswerKey,
    /// Everything else.
    QuestionPaper,
}

impl ClassificationLabel {
    /// Both labels, answer keys first.
    pub const ALL: [Self; 2] = [Self::AnswerKey, Self::QuestionPaper];

    /// Directory name used under the subject directory.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::AnswerKey => "answer_key",
            Self::QuestionPaper => "question_paper",
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Errors raised when a downloaded artifact cannot be inspected.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The file is not a loadable PDF.
    #[error("cannot open {path} as PDF: {reason}")]
    Unreadable {
        /// Offending file.
        path: PathBuf,
        /// Parser error text.
        reason: String,
    },

    /// The PDF has no pages.
    #[error("PDF {path} has no pages")]
    NoPages {
        /// Offending file.
        path: PathBuf,
    },

    /// The blocking extraction task was cancelled or panicked.
    #[error("text extraction task for {path} failed: {reason}")]
    Task {
        /// File being inspected.
        path: PathBuf,
        /// Join error text.
        reason: String,
    },
}

impl ClassifyError {
    pub(crate) fn unreadable(path: &Path, error: lopdf::Error) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }
}

/// Classifies a document from its file name and first-page text.
#[must_use]
pub fn classify(file_name: &str, first_page_text: &str) -> ClassificationLabel {
    if let Some(marker) = find_marker(file_name) {
        debug!(file_name, marker, "answer-key marker in file name");
        return ClassificationLabel::AnswerKey;
    }
    if let Some(marker) = find_marker(first_page_text) {
        debug!(file_name, marker, "answer-key marker in first page");
        return ClassificationLabel::AnswerKey;
    }
    ClassificationLabel::QuestionPaper
}

/// Opens `path` and classifies it by `file_name` plus its first page.
///
/// Extraction runs on the blocking pool.
///
/// # Errors
///
/// Returns [`ClassifyError`] when the file cannot be opened as a PDF.
#[instrument(skip(path), fields(path = %path.display()))]
pub async fn classify_file(
    path: &Path,
    file_name: &str,
) -> Result<ClassificationLabel, ClassifyError> {
    let owned = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || first_page_text(&owned))
        .await
        .map_err(|e| ClassifyError::Task {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })??;
    Ok(classify(file_name, &text))
}
