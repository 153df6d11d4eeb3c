//! Run report handed to the API layer.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::classify::ClassificationLabel;

/// How a document came to be at its path in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Downloaded, classified and placed by this run.
    Fetched,
    /// A file with the same name already existed; nothing was fetched.
    AlreadyPresent,
}

/// A document on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedDocument {
    /// Listing URL the document came from.
    pub source_url: String,
    /// Final path under the documents root.
    pub path: PathBuf,
    /// Kind directory the file lives in.
    pub kind: ClassificationLabel,
    /// Whether this run fetched it.
    pub placement: Placement,
}

/// Pipeline stage at which an entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Download exhausted its attempts.
    Fetch,
    /// The downloaded file could not be opened as a PDF; it was deleted.
    Classify,
    /// The classified file could not be moved into place.
    Place,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Classify => "classify",
            Self::Place => "place",
        })
    }
}

/// An entry that was skipped because of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Document URL.
    pub url: String,
    /// Display name from the listing.
    pub name: String,
    /// Stage that failed.
    pub stage: FailureStage,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of one acquisition run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionReport {
    /// Logical document name to placement.
    pub documents: BTreeMap<String, PlacedDocument>,
    /// Entries that failed, in listing order.
    pub failures: Vec<FailureRecord>,
    /// Listing entries discovered.
    pub discovered: usize,
    /// Results pages collected.
    pub pages_visited: u32,
    /// Set when the run stopped early on the interruption flag.
    pub interrupted: bool,
}

impl AcquisitionReport {
    /// Documents fetched by this run.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.count(Placement::Fetched)
    }

    /// Documents skipped because they were already on disk.
    #[must_use]
    pub fn already_present(&self) -> usize {
        self.count(Placement::AlreadyPresent)
    }

    /// Documents of `kind`, regardless of placement.
    #[must_use]
    pub fn count_kind(&self, kind: ClassificationLabel) -> usize {
        self.documents.values().filter(|d| d.kind == kind).count()
    }

    /// True when no entry failed and the run was not interrupted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    fn count(&self, placement: Placement) -> usize {
        self.documents
            .values()
            .filter(|d| d.placement == placement)
            .count()
    }
}
