//! Acquisition: listing, fetching, classifying and placing one query's documents.
//!
//! [`Acquirer::acquire`] validates the query, collects the listing, then drives
//! every entry through
//!
//! ```text
//! Discovered -> name taken by another entry? -> PlaceFailed (recorded)
//!            -> already placed? -> AlreadyPresent
//!            -> Fetching -> FetchFailed (recorded)
//!                        -> Classifying -> ClassifyFailed (deleted, recorded)
//!                                       -> Placed
//! ```
//!
//! Only configuration, navigation and layout errors end a run. Every per-entry
//! failure is recorded in the [`AcquisitionReport`] and the run moves on.

mod layout;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::cache::DocumentCache;
use crate::classify::classify_file;
use crate::download::{
    DEFAULT_MAX_RETRIES, DocumentFetcher, DownloadError, HttpClient,
    constants::{CONNECT_TIMEOUT_SECS, DEFAULT_BACKOFF_STEP, READ_TIMEOUT_SECS},
};
use crate::navigator::{
    BrowserLauncher, ListingEntry, NavigatorError, NavigatorTimeouts, PageNavigator,
    SiteProfile, WalkEnd,
};
use crate::query::{Query, QueryError, QueryParams};

pub use layout::{
    INCOMING_DIR, LayoutError, MAX_FILE_NAME_BYTES, SubjectLayout, UNKNOWN_SUBJECT,
    document_file_name, sanitize_subject,
};
pub use report::{AcquisitionReport, FailureRecord, FailureStage, Placement, PlacedDocument};

/// Default documents root, relative to the working directory.
pub const DEFAULT_DOCUMENTS_ROOT: &str = "documents";

/// Minimum concurrent entries.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum concurrent entries.
pub const MAX_CONCURRENCY: usize = 16;

/// Per-run settings. Passed explicitly; nothing is read from global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireSettings {
    /// Root of the subject directories.
    pub documents_root: PathBuf,
    /// Attempts per document.
    pub max_retries: u32,
    /// Linear backoff step between attempts.
    pub backoff_step: Duration,
    /// Entries fetched at once. `1` is sequential.
    pub concurrency: usize,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Browser timeouts.
    pub timeouts: NavigatorTimeouts,
    /// Library site.
    pub site: SiteProfile,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            documents_root: PathBuf::from(DEFAULT_DOCUMENTS_ROOT),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_step: DEFAULT_BACKOFF_STEP,
            concurrency: MIN_CONCURRENCY,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            timeouts: NavigatorTimeouts::default(),
            site: SiteProfile::default(),
        }
    }
}

impl AcquireSettings {
    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::InvalidConcurrency`] or [`AcquireError::InvalidRetries`].
    pub fn validate(&self) -> Result<(), AcquireError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(AcquireError::InvalidConcurrency {
                value: self.concurrency,
            });
        }
        if self.max_retries == 0 {
            return Err(AcquireError::InvalidRetries);
        }
        Ok(())
    }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The query failed validation; nothing was contacted.
    #[error("invalid query: {0}")]
    Configuration(#[from] QueryError),

    /// Concurrency outside the supported range.
    #[error("concurrency must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}, got {value}")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Zero attempts requested.
    #[error("max_retries must be at least 1")]
    InvalidRetries,

    /// Browser launch or initial listing load failed.
    #[error(transparent)]
    Navigation(#[from] NavigatorError),

    /// The subject directories could not be created.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Runs acquisitions against one library site.
#[derive(Debug)]
pub struct Acquirer {
    navigator: PageNavigator,
    fetcher: DocumentFetcher,
    settings: AcquireSettings,
    cache: Option<Arc<DocumentCache>>,
    interrupted: Option<Arc<AtomicBool>>,
}

impl Acquirer {
    /// Creates an acquirer that launches browsers with `launcher`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError`] when `settings` are out of range.
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        settings: AcquireSettings,
    ) -> Result<Self, AcquireError> {
        settings.validate()?;

        let client =
            HttpClient::new_with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs);
        let fetcher = DocumentFetcher::new(client).with_backoff_step(settings.backoff_step);
        let navigator =
            PageNavigator::new(launcher, settings.site.clone()).with_timeouts(settings.timeouts);

        debug!(
            documents_root = %settings.documents_root.display(),
            max_retries = settings.max_retries,
            backoff_ms = settings.backoff_step.as_millis(),
            concurrency = settings.concurrency,
            "creating acquirer"
        );

        Ok(Self {
            navigator,
            fetcher,
            settings,
            cache: None,
            interrupted: None,
        })
    }

    /// Refreshes `cache` with every listing this acquirer collects.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<DocumentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Installs a cooperative interruption flag.
    ///
    /// The flag is checked between listing pages, between fetch attempts and
    /// between entries.
    #[must_use]
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.navigator = self.navigator.with_interrupt_flag(Arc::clone(&interrupted));
        self.fetcher = self.fetcher.with_interrupt_flag(Arc::clone(&interrupted));
        self.interrupted = Some(interrupted);
        self
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &AcquireSettings {
        &self.settings
    }

    /// Validates `params` and runs one acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Configuration`] before any network activity when
    /// the query is invalid, and the fatal errors of [`Acquirer::acquire_query`].
    pub async fn acquire(&self, params: QueryParams) -> Result<AcquisitionReport, AcquireError> {
        let query = params.validate()?;
        self.acquire_query(&query).await
    }

    /// Runs one acquisition for an already validated query.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Navigation`] when the listing cannot be loaded and
    /// [`AcquireError::Layout`] when the subject directories cannot be created.
    #[instrument(skip(self, query), fields(subject = %query.subject(), pages = query.pages()))]
    pub async fn acquire_query(&self, query: &Query) -> Result<AcquisitionReport, AcquireError> {
        let listing = self.navigator.list_filtered(query).await?;

        if let Some(cache) = &self.cache {
            cache.refresh(query, listing.entries()).await;
        }

        let layout = Arc::new(SubjectLayout::new(
            &self.settings.documents_root,
            query.subject(),
        ));
        layout.ensure().await?;

        let mut report = AcquisitionReport {
            discovered: listing.len(),
            pages_visited: listing.pages_visited(),
            interrupted: listing.end() == WalkEnd::Interrupted,
            ..AcquisitionReport::default()
        };

        let outcomes = self.process_entries(&layout, listing.into_entries()).await;
        for (entry, outcome) in outcomes {
            match outcome {
                EntryOutcome::Placed(document) => {
                    if let Some(existing) = report.documents.get(&entry.name) {
                        debug!(
                            name = %entry.name,
                            kept = %existing.source_url,
                            skipped = %entry.url,
                            "second listing entry with the same name"
                        );
                    } else {
                        report.documents.insert(entry.name, document);
                    }
                }
                EntryOutcome::Failed(failure) => report.failures.push(failure),
                EntryOutcome::Interrupted => report.interrupted = true,
            }
        }

        info!(
            discovered = report.discovered,
            downloaded = report.downloaded(),
            already_present = report.already_present(),
            failed = report.failures.len(),
            interrupted = report.interrupted,
            "acquisition complete"
        );
        Ok(report)
    }

    /// Runs every entry, at most `concurrency` at a time. Outcomes keep listing order.
    async fn process_entries(
        &self,
        layout: &Arc<SubjectLayout>,
        entries: Vec<ListingEntry>,
    ) -> Vec<(ListingEntry, EntryOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let worker = EntryWorker {
            fetcher: self.fetcher.clone(),
            layout: Arc::clone(layout),
            max_retries: self.settings.max_retries,
            locks: Arc::new(DashMap::new()),
            claims: Arc::new(DashMap::new()),
        };

        let mut handles = Vec::with_capacity(entries.len());
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if self.is_interrupted() {
                info!(remaining_from = %entry.url, "interrupted; not starting further entries");
                outcomes.push((entry, EntryOutcome::Interrupted));
                break;
            }

            let worker = worker.clone();
            let task_entry = entry.clone();
            handles.push((
                entry,
                tokio::spawn(async move {
                    let _permit = permit;
                    worker.run(&task_entry).await
                }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len() + outcomes.len());
        for (entry, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(url = %entry.url, error = %error, "entry task failed");
                    EntryOutcome::Failed(FailureRecord {
                        url: entry.url.clone(),
                        name: entry.name.clone(),
                        stage: FailureStage::Fetch,
                        reason: format!("task failed: {error}"),
                    })
                }
            };
            results.push((entry, outcome));
        }
        results.extend(outcomes);
        results
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

enum EntryOutcome {
    Placed(PlacedDocument),
    Failed(FailureRecord),
    Interrupted,
}

/// Owned context for one entry task. The lock and claim maps live for one run.
#[derive(Clone)]
struct EntryWorker {
    fetcher: DocumentFetcher,
    layout: Arc<SubjectLayout>,
    max_retries: u32,
    /// File name -> placement lock; both kind directories share the key.
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    /// File name -> display name of the entry that claimed it.
    claims: Arc<DashMap<String, String>>,
}

impl EntryWorker {
    #[instrument(skip(self, entry), fields(url = %entry.url, name = %entry.name))]
    async fn run(&self, entry: &ListingEntry) -> EntryOutcome {
        let file_name = document_file_name(&entry.name);
        let staged = self.layout.staging_path(&file_name);

        let lock = self
            .locks
            .entry(file_name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(owner) = self.claim(&file_name, &entry.name) {
            warn!(file_name = %file_name, owner = %owner, "file name already used by another entry");
            return failed(
                entry,
                FailureStage::Place,
                format!("file name {file_name} collides with entry \"{owner}\""),
            );
        }

        if let Some((kind, path)) = self.layout.existing_placement(&file_name).await {
            debug!(kind = %kind, path = %path.display(), "already present; skipping");
            return EntryOutcome::Placed(PlacedDocument {
                source_url: entry.url.clone(),
                path,
                kind,
                placement: Placement::AlreadyPresent,
            });
        }

        let fetched = match self.fetcher.fetch(&entry.url, &staged, self.max_retries).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                if matches!(failure.last_error, DownloadError::Interrupted { .. }) {
                    return EntryOutcome::Interrupted;
                }
                warn!(attempts = failure.attempts, error = %failure.last_error, "skipping document");
                return failed(entry, FailureStage::Fetch, failure.to_string());
            }
        };

        let kind = match classify_file(&fetched.path, &file_name).await {
            Ok(kind) => kind,
            Err(error) => {
                warn!(error = %error, "downloaded file is not a readable PDF; deleting");
                remove_quietly(&fetched.path).await;
                return failed(entry, FailureStage::Classify, error.to_string());
            }
        };

        match self.layout.place(&fetched.path, kind, &file_name).await {
            Ok(path) => {
                info!(kind = %kind, path = %path.display(), bytes = fetched.bytes, "document placed");
                EntryOutcome::Placed(PlacedDocument {
                    source_url: entry.url.clone(),
                    path,
                    kind,
                    placement: Placement::Fetched,
                })
            }
            Err(error) => {
                warn!(error = %error, "placing document failed");
                remove_quietly(&fetched.path).await;
                failed(entry, FailureStage::Place, error.to_string())
            }
        }
    }

    /// Claims `file_name` for `display_name`. Returns the other display name when
    /// a different entry already holds it.
    fn claim(&self, file_name: &str, display_name: &str) -> Option<String> {
        match self.claims.entry(file_name.to_string()) {
            Entry::Occupied(owner) if owner.get() != display_name => Some(owner.get().clone()),
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(display_name.to_string());
                None
            }
        }
    }
}

fn failed(entry: &ListingEntry, stage: FailureStage, reason: String) -> EntryOutcome {
    EntryOutcome::Failed(FailureRecord {
        url: entry.url.clone(),
        name: entry.name.clone(),
        stage,
        reason,
    })
}

async fn remove_quietly(path: &std::path::Path) {
    if let Err(error) = tokio::fs::remove_file(path).await
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %error, "failed to remove file");
    }
}
