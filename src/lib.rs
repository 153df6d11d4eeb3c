//! Exambank Core Library
//!
//! Builds a local exam-paper bank from a library website: walks the filtered
//! listing in a browser, downloads each paper with retries and integrity checks,
//! and files it as a question paper or an answer key.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`query`] - Acquisition requests and their validation
//! - [`navigator`] - Browser-driven listing and pagination
//! - [`download`] - Streaming PDF fetcher with retry and atomic placement
//! - [`classify`] - Answer-key vs question-paper classification
//! - [`acquire`] - The pipeline tying them together, plus the on-disk layout
//! - [`cache`] - Name-to-URL cache of the latest listing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod acquire;
pub mod cache;
pub mod classify;
pub mod download;
pub mod navigator;
pub mod query;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use acquire::{
    AcquireError, AcquireSettings, Acquirer, AcquisitionReport, FailureRecord, FailureStage,
    LayoutError, MAX_CONCURRENCY, MIN_CONCURRENCY, Placement, PlacedDocument, SubjectLayout,
    sanitize_subject,
};
pub use cache::{CachedDocument, DocumentCache};
pub use classify::{ClassificationLabel, ClassifyError, classify, classify_file};
pub use download::{
    DEFAULT_MAX_RETRIES, DocumentFetcher, DownloadError, FetchFailure, FetchedDocument,
    HttpClient, RetryPolicy,
};
pub use navigator::chromium::ChromiumLauncher;
pub use navigator::{
    BrowserLauncher, BrowserSession, Listing, ListingEntry, NavigatorError, NavigatorTimeouts,
    PageNavigator, SiteProfile,
};
pub use query::{DEFAULT_DOCUMENT_TYPE, DEFAULT_PAGES, Query, QueryError, QueryParams};
