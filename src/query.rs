//! Acquisition queries and their validation.
//!
//! A [`Query`] can only be built from [`QueryParams`] that pass validation, so an
//! invalid subject is rejected before any browser or network work starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document type requested when none is given.
pub const DEFAULT_DOCUMENT_TYPE: &str = "Exam Papers";

/// Listing pages walked when none is given.
pub const DEFAULT_PAGES: u32 = 5;

/// Subject values that mean "no filter" in the library's dropdowns.
const PLACEHOLDER_SUBJECTS: &[&str] = &["all", "any", "none", "select", "select subject", "-", "*"];

/// Configuration errors in an acquisition request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Subject is empty or whitespace.
    #[error("subject is required")]
    MissingSubject,

    /// Subject is a dropdown placeholder rather than a real subject.
    #[error("subject '{subject}' is a placeholder; choose a specific subject")]
    PlaceholderSubject {
        /// The rejected value.
        subject: String,
    },

    /// Page count below one.
    #[error("pages must be at least 1, got {pages}")]
    InvalidPages {
        /// The rejected value.
        pages: u32,
    },
}

/// Unvalidated query fields, as received from the CLI or an API request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Exam category, e.g. `GCE 'A' Levels`. Empty means unfiltered.
    pub category: String,
    /// Subject, e.g. `H2 Economics`. Required.
    pub subject: String,
    /// Exam year filter.
    pub year: Option<u16>,
    /// Document type filter, e.g. `Exam Papers`. Empty means unfiltered.
    pub document_type: String,
    /// Number of listing pages to walk (1-indexed, inclusive).
    pub pages: u32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            category: String::new(),
            subject: String::new(),
            year: None,
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            pages: DEFAULT_PAGES,
        }
    }
}

impl QueryParams {
    /// Validates the fields and freezes them into a [`Query`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for a missing or placeholder subject or `pages == 0`.
    pub fn validate(self) -> Result<Query, QueryError> {
        Query::try_from(self)
    }
}

/// An immutable, validated acquisition request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Query {
    category: Option<String>,
    subject: String,
    year: Option<u16>,
    document_type: Option<String>,
    pages: u32,
}

impl TryFrom<QueryParams> for Query {
    type Error = QueryError;

    fn try_from(params: QueryParams) -> Result<Self, Self::Error> {
        let subject = validate_subject(&params.subject)?;
        if params.pages == 0 {
            return Err(QueryError::InvalidPages { pages: 0 });
        }
        Ok(Self {
            category: non_empty(params.category),
            subject,
            year: params.year,
            document_type: non_empty(params.document_type),
            pages: params.pages,
        })
    }
}

impl Query {
    /// Category filter, if any.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Subject filter (always present).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Year filter, if any.
    #[must_use]
    pub fn year(&self) -> Option<u16> {
        self.year
    }

    /// Document-type filter, if any.
    #[must_use]
    pub fn document_type(&self) -> Option<&str> {
        self.document_type.as_deref()
    }

    /// Listing pages to walk.
    #[must_use]
    pub fn pages(&self) -> u32 {
        self.pages
    }
}

/// Trims and checks a subject.
///
/// # Errors
///
/// Returns [`QueryError::MissingSubject`] or [`QueryError::PlaceholderSubject`].
pub fn validate_subject(subject: &str) -> Result<String, QueryError> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return Err(QueryError::MissingSubject);
    }
    if PLACEHOLDER_SUBJECTS
        .iter()
        .any(|placeholder| trimmed.eq_ignore_ascii_case(placeholder))
    {
        return Err(QueryError::PlaceholderSubject {
            subject: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
