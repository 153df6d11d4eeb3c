//! Constants for the download module (timeouts, retry pacing, PDF validation).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes; exam papers are small).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Default linear backoff step. Attempt `n` waits `n * step` before the next try.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(600);

/// Smallest body accepted as a PDF. Anything shorter cannot hold a header,
/// one object and a trailer.
pub const MIN_PDF_BYTES: u64 = 64;

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Suffix appended to the final file name while a body is being streamed.
pub const PARTIAL_SUFFIX: &str = ".part";
