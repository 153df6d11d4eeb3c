//! Page navigation: turning a [`Query`] into a listing of document links.
//!
//! [`PageNavigator::list_filtered`] opens one browser session, loads the
//! filtered listing URL and walks up to `query.pages()` results pages, collecting
//! every document anchor. Only the initial load can fail the call; empty pages,
//! a missing "Next" control and pages that never load are logged and end the walk
//! with whatever was collected so far.

pub mod chromium;
mod session;
mod site;
mod wait;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::query::Query;

pub use session::{Anchor, BrowserLauncher, BrowserSession, NextControl, SessionError};
pub use site::{DEFAULT_DOCUMENT_PREFIX, DEFAULT_LIBRARY_URL, PAGE_PARAM, SiteProfile, page_index};
pub use wait::{Condition, WaitOutcome, wait_for};

/// Bound on the initial page load.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Bound on waiting for document links to render on a page.
pub const DEFAULT_RESULTS_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on waiting for the URL to show the next page after clicking "Next".
pub const DEFAULT_PAGINATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Poll interval for waits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeouts used while walking a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorTimeouts {
    /// Initial page load.
    pub navigation: Duration,
    /// Document links appearing on a page.
    pub results: Duration,
    /// URL reflecting the next page.
    pub pagination: Duration,
    /// Poll interval for both waits.
    pub poll: Duration,
}

impl Default for NavigatorTimeouts {
    fn default() -> Self {
        Self {
            navigation: DEFAULT_NAVIGATION_TIMEOUT,
            results: DEFAULT_RESULTS_TIMEOUT,
            pagination: DEFAULT_PAGINATION_TIMEOUT,
            poll: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Fatal navigation errors. Anything after the first page load is non-fatal.
#[derive(Debug, Error)]
pub enum NavigatorError {
    /// The configured library URL cannot carry the query.
    #[error("invalid listing URL {url}: {source}")]
    InvalidListingUrl {
        /// Configured base URL.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },

    /// No browser session could be started.
    #[error("browser unavailable: {0}")]
    Launch(#[source] SessionError),

    /// The listing did not load within the navigation timeout.
    #[error("timed out after {timeout_ms} ms loading {url}")]
    NavigationTimeout {
        /// Listing URL.
        url: String,
        /// Configured bound.
        timeout_ms: u64,
    },

    /// The browser reported a failure loading the listing.
    #[error("failed to load {url}: {source}")]
    Navigation {
        /// Listing URL.
        url: String,
        /// Backend error.
        #[source]
        source: SessionError,
    },
}

/// One discovered document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Absolute document URL; unique within a listing.
    pub url: String,
    /// Display name shown by the library; used as the logical document name.
    pub name: String,
}

impl ListingEntry {
    /// Builds an entry from an anchor, falling back to the URL's file stem when
    /// the anchor has no visible text.
    #[must_use]
    pub fn from_anchor(href: &str, text: &str) -> Self {
        let text = collapse_whitespace(text);
        let name = if text.is_empty() {
            name_from_url(href)
        } else {
            text
        };
        Self {
            url: href.to_string(),
            name,
        }
    }
}

/// Why the page walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkEnd {
    /// Requested page count reached.
    PageLimit,
    /// "Next" control absent or disabled.
    LastPage,
    /// The URL did not move to the next page in time, or the click failed.
    Stalled,
    /// The interruption flag was raised.
    Interrupted,
}

/// Entries collected for one query, deduplicated by URL in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<ListingEntry>,
    index: HashMap<String, usize>,
    pages_visited: u32,
    end: WalkEnd,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            pages_visited: 0,
            end: WalkEnd::PageLimit,
        }
    }
}

impl Listing {
    /// Adds an entry. A URL already present keeps its position and takes the new name.
    pub fn push(&mut self, entry: ListingEntry) {
        if let Some(&position) = self.index.get(&entry.url) {
            if self.entries[position].name != entry.name {
                debug!(
                    url = %entry.url,
                    previous = %self.entries[position].name,
                    name = %entry.name,
                    "duplicate listing URL renamed"
                );
            }
            self.entries[position] = entry;
        } else {
            self.index.insert(entry.url.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Entries in first-seen order.
    #[must_use]
    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    /// Consumes the listing.
    #[must_use]
    pub fn into_entries(self) -> Vec<ListingEntry> {
        self.entries
    }

    /// Number of unique entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Results pages whose links were collected.
    #[must_use]
    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    /// Why the walk stopped.
    #[must_use]
    pub fn end(&self) -> WalkEnd {
        self.end
    }
}

/// Walks the library listing in a browser.
#[derive(Clone)]
pub struct PageNavigator {
    launcher: Arc<dyn BrowserLauncher>,
    site: SiteProfile,
    timeouts: NavigatorTimeouts,
    interrupted: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for PageNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageNavigator")
            .field("site", &self.site)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl PageNavigator {
    /// Creates a navigator with default timeouts.
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>, site: SiteProfile) -> Self {
        Self {
            launcher,
            site,
            timeouts: NavigatorTimeouts::default(),
            interrupted: None,
        }
    }

    /// Overrides the timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: NavigatorTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Installs a cooperative interruption flag, checked between pages.
    #[must_use]
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Site this navigator walks.
    #[must_use]
    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    /// Collects the filtered listing for `query`.
    ///
    /// The browser session is closed before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`NavigatorError`] when the listing URL is invalid, no browser can
    /// be launched, or the initial page load fails or times out.
    #[instrument(skip(self, query), fields(subject = %query.subject(), pages = query.pages()))]
    pub async fn list_filtered(&self, query: &Query) -> Result<Listing, NavigatorError> {
        let url = self.site.listing_url(query).map_err(|source| {
            NavigatorError::InvalidListingUrl {
                url: self.site.library_url.clone(),
                source,
            }
        })?;

        let mut session = self
            .launcher
            .launch()
            .await
            .map_err(NavigatorError::Launch)?;

        let result = self.walk(session.as_mut(), &url, query.pages()).await;

        if let Err(error) = session.close().await {
            warn!(error = %error, "failed to close browser session");
        }

        if let Ok(listing) = &result {
            info!(
                entries = listing.len(),
                pages_visited = listing.pages_visited(),
                end = ?listing.end(),
                "listing collected"
            );
        }
        result
    }

    async fn walk(
        &self,
        session: &mut dyn BrowserSession,
        url: &Url,
        pages: u32,
    ) -> Result<Listing, NavigatorError> {
        debug!(url = %url, "loading listing");
        match tokio::time::timeout(self.timeouts.navigation, session.navigate(url.as_str())).await
        {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                return Err(NavigatorError::Navigation {
                    url: url.to_string(),
                    source,
                });
            }
            Err(_) => {
                return Err(NavigatorError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: u64::try_from(self.timeouts.navigation.as_millis())
                        .unwrap_or(u64::MAX),
                });
            }
        }

        let selector = self.site.document_selector();
        let mut listing = Listing::default();

        for page in 1..=pages {
            if page > 1 && self.is_interrupted() {
                info!(page, "interrupted; stopping pagination");
                listing.end = WalkEnd::Interrupted;
                break;
            }

            let added = self.collect_page(session, &selector, page, &mut listing).await;
            listing.pages_visited = page;
            debug!(page, added, total = listing.len(), "page collected");

            if page == pages {
                listing.end = WalkEnd::PageLimit;
                break;
            }

            match self.advance(session, page).await {
                Some(end) => {
                    listing.end = end;
                    break;
                }
                None => continue,
            }
        }

        Ok(listing)
    }

    /// Waits for document links on the current page and collects them.
    async fn collect_page(
        &self,
        session: &mut dyn BrowserSession,
        selector: &str,
        page: u32,
        listing: &mut Listing,
    ) -> usize {
        match wait_for(
            session,
            Condition::ElementsPresent(selector),
            self.timeouts.results,
            self.timeouts.poll,
        )
        .await
        {
            Ok(WaitOutcome::Satisfied) => {}
            Ok(WaitOutcome::TimedOut) => {
                warn!(page, "no document links rendered before timeout; treating page as empty");
                return 0;
            }
            Err(error) => {
                warn!(page, error = %error, "waiting for document links failed; treating page as empty");
                return 0;
            }
        }

        let anchors = match session.anchors(selector).await {
            Ok(anchors) => anchors,
            Err(error) => {
                warn!(page, error = %error, "reading document links failed; treating page as empty");
                return 0;
            }
        };

        let mut added = 0;
        for anchor in anchors {
            let Some(href) = anchor.href.as_deref() else {
                continue;
            };
            if !self.site.is_document_link(href) {
                continue;
            }
            listing.push(ListingEntry::from_anchor(href, &anchor.text));
            added += 1;
        }
        added
    }

    /// Moves from `page` to `page + 1`. Returns why the walk ends, or `None` to continue.
    async fn advance(&self, session: &mut dyn BrowserSession, page: u32) -> Option<WalkEnd> {
        match session.next_control().await {
            Ok(NextControl::Enabled) => {}
            Ok(state) => {
                debug!(page, ?state, "no further results pages");
                return Some(WalkEnd::LastPage);
            }
            Err(error) => {
                warn!(page, error = %error, "cannot inspect pager; stopping pagination");
                return Some(WalkEnd::Stalled);
            }
        }

        if let Err(error) = session.click_next().await {
            warn!(page, error = %error, "clicking Next failed; stopping pagination");
            return Some(WalkEnd::Stalled);
        }

        let next = page + 1;
        match wait_for(
            session,
            Condition::OnPage(next),
            self.timeouts.pagination,
            self.timeouts.poll,
        )
        .await
        {
            Ok(WaitOutcome::Satisfied) => None,
            Ok(WaitOutcome::TimedOut) => {
                warn!(
                    page = next,
                    timeout_ms = self.timeouts.pagination.as_millis(),
                    "pagination stalled; returning pages collected so far"
                );
                Some(WalkEnd::Stalled)
            }
            Err(error) => {
                warn!(page = next, error = %error, "pagination check failed; stopping");
                Some(WalkEnd::Stalled)
            }
        }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// File stem of the URL's last path segment, percent-decoded.
fn name_from_url(href: &str) -> String {
    let segment = Url::parse(href)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_default();
    let decoded = urlencoding::decode(&segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or(segment);
    let stem = decoded
        .strip_suffix(".pdf")
        .or_else(|| decoded.strip_suffix(".PDF"))
        .unwrap_or(&decoded);
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}
