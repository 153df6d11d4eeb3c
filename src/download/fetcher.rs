//! Retrying, atomically-placed PDF fetches.
//!
//! [`DocumentFetcher::fetch`] streams each attempt into a `<name>.part` file next
//! to the destination and only renames it into place once the body is complete.
//! The renamed file is then checked with [`validate_pdf`]; a file that fails the
//! check is removed again. Both paths are cleared before every attempt, so after
//! a failed fetch nothing is left at the destination.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::fs::File;
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, stream_to_file};
use super::constants::{DEFAULT_BACKOFF_STEP, PARTIAL_SUFFIX};
use super::error::{DownloadError, FetchFailure};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::validation::validate_pdf;

/// A validated document at its final path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Final path of the validated file.
    pub path: PathBuf,
    /// Size of the file in bytes.
    pub bytes: u64,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Downloads documents with retries, atomic placement and PDF validation.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: HttpClient,
    backoff_step: Duration,
    interrupted: Option<Arc<AtomicBool>>,
}

impl DocumentFetcher {
    /// Creates a fetcher with the default 600 ms backoff step.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            backoff_step: DEFAULT_BACKOFF_STEP,
            interrupted: None,
        }
    }

    /// Overrides the linear backoff step.
    #[must_use]
    pub fn with_backoff_step(mut self, backoff_step: Duration) -> Self {
        self.backoff_step = backoff_step;
        self
    }

    /// Installs a cooperative interruption flag, checked before every retry.
    #[must_use]
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Fetches `url` into `destination`, making up to `max_retries` attempts.
    ///
    /// Never panics or propagates: once the attempts are spent the last error is
    /// returned inside a [`FetchFailure`] naming the URL and destination.
    ///
    /// # Errors
    ///
    /// Returns [`FetchFailure`] when no attempt produced a valid PDF.
    #[instrument(skip(self), fields(url = %url, destination = %destination.display()))]
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        max_retries: u32,
    ) -> Result<FetchedDocument, FetchFailure> {
        let policy = RetryPolicy::new(max_retries, self.backoff_step);
        let mut attempt: u32 = 1;

        loop {
            if attempt > 1 && self.is_interrupted() {
                debug!(attempt, "interrupted before retry");
                return Err(FetchFailure {
                    url: url.to_string(),
                    destination: destination.to_path_buf(),
                    attempts: attempt - 1,
                    last_error: DownloadError::interrupted(url),
                });
            }

            clear_paths(destination).await;

            match self.attempt(url, destination).await {
                Ok(bytes) => {
                    info!(bytes, attempt, "document fetched");
                    return Ok(FetchedDocument {
                        path: destination.to_path_buf(),
                        bytes,
                        attempts: attempt,
                    });
                }
                Err(error) => {
                    warn!(attempt, error = %error, "fetch attempt failed");
                    match policy.should_retry(classify_error(&error), attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next,
                        } => {
                            tokio::time::sleep(delay).await;
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            clear_paths(destination).await;
                            debug!(reason = %reason, "giving up");
                            return Err(FetchFailure {
                                url: url.to_string(),
                                destination: destination.to_path_buf(),
                                attempts: attempt,
                                last_error: error,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn attempt(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let response = self.client.get(url).await?;

        let (partial, file) = PartialFile::create(destination).await?;
        let written = stream_to_file(file, response, url, partial.path()).await?;
        debug!(bytes = written, partial = %partial.path().display(), "body written");
        partial.commit().await?;

        match validate_pdf(destination).await {
            Ok(size) => Ok(size),
            Err(error) => {
                remove_if_exists(destination).await;
                Err(error)
            }
        }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Returns the partial path used while streaming into `destination`.
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

/// A `.part` file that is removed on drop unless it was renamed into place.
struct PartialFile {
    path: PathBuf,
    destination: PathBuf,
    committed: bool,
}

impl PartialFile {
    async fn create(destination: &Path) -> Result<(Self, File), DownloadError> {
        let path = partial_path(destination);
        let file = File::create(&path)
            .await
            .map_err(|e| DownloadError::io(&path, e))?;
        Ok((
            Self {
                path,
                destination: destination.to_path_buf(),
                committed: false,
            },
            file,
        ))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(mut self) -> Result<(), DownloadError> {
        tokio::fs::rename(&self.path, &self.destination)
            .await
            .map_err(|e| DownloadError::io(&self.destination, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn clear_paths(destination: &Path) {
    remove_if_exists(&partial_path(destination)).await;
    remove_if_exists(destination).await;
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed stale file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove file"),
    }
}
