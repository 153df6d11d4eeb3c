//! Document fetching: streaming HTTP downloads with retry and PDF validation.
//!
//! # Features
//!
//! - Streaming downloads into a `.part` file, renamed into place when complete
//! - PDF plausibility check (minimum size, `%PDF-` magic) after placement
//! - Linear backoff between attempts (`step * attempt`)
//! - Configurable connect/read timeouts
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use exambank_core::download::{DocumentFetcher, HttpClient};
//! use std::path::Path;
//!
//! # async fn example() {
//! let fetcher = DocumentFetcher::new(HttpClient::new());
//! match fetcher
//!     .fetch("https://example.com/paper.pdf", Path::new("./docs/paper.pdf"), 3)
//!     .await
//! {
//!     Ok(doc) => println!("Downloaded: {}", doc.path.display()),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod fetcher;
mod retry;
mod validation;

pub use client::HttpClient;
pub use error::{DownloadError, FetchFailure};
pub use fetcher::{DocumentFetcher, FetchedDocument, partial_path};
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use validation::{has_pdf_magic, validate_pdf};
