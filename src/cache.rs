//! Name-to-URL cache of the most recent listing.
//!
//! Lets callers resolve a downloaded file back to its source URL without walking
//! the library again. The cache is scoped to one query: refreshing it with a
//! different query discards everything it held.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::navigator::ListingEntry;
use crate::query::Query;

/// What the cache knows about one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDocument {
    /// Source URL.
    pub url: String,
    /// Year filter of the query that listed it.
    pub year: Option<u16>,
}

#[derive(Debug, Default)]
struct CacheState {
    query: Option<Query>,
    documents: HashMap<String, CachedDocument>,
}

/// Shared, independently locked listing cache.
///
/// Wrap in `Arc` to share between an acquirer and the API layer.
#[derive(Debug, Default)]
pub struct DocumentCache {
    state: RwLock<CacheState>,
}

impl DocumentCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entries` listed for `query`.
    ///
    /// A query different from the cached one replaces the whole cache; the same
    /// query merges, with later entries overwriting earlier ones of the same name.
    pub async fn refresh(&self, query: &Query, entries: &[ListingEntry]) {
        let mut state = self.state.write().await;
        if state.query.as_ref() != Some(query) {
            debug!(
                previous = state.documents.len(),
                subject = %query.subject(),
                "query changed; rebuilding document cache"
            );
            state.documents.clear();
            state.query = Some(query.clone());
        }
        for entry in entries {
            state.documents.insert(
                entry.name.clone(),
                CachedDocument {
                    url: entry.url.clone(),
                    year: query.year(),
                },
            );
        }
    }

    /// Looks up a document by display name.
    pub async fn resolve(&self, name: &str) -> Option<CachedDocument> {
        self.state.read().await.documents.get(name).cloned()
    }

    /// Query the cache currently describes.
    pub async fn query(&self) -> Option<Query> {
        self.state.read().await.query.clone()
    }

    /// Number of cached documents.
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// True when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.documents.is_empty()
    }

    /// Drops everything.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.documents.clear();
        state.query = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::QueryParams;

    fn query(subject: &str, year: Option<u16>) -> Query {
        QueryParams {
            subject: subject.to_string(),
            year,
            ..QueryParams::default()
        }
        .validate()
        .unwrap()
    }

    fn entry(name: &str, url: &str) -> ListingEntry {
        ListingEntry {
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_after_refresh() {
        let cache = DocumentCache::new();
        cache
            .refresh(&query("H2 Economics", Some(2023)), &[entry("P1", "https://d/p1.pdf")])
            .await;

        let doc = cache.resolve("P1").await.unwrap();
        assert_eq!(doc.url, "https://d/p1.pdf");
        assert_eq!(doc.year, Some(2023));
        assert!(cache.resolve("P2").await.is_none());
    }

    #[tokio::test]
    async fn test_same_query_merges() {
        let cache = DocumentCache::new();
        let q = query("H2 Economics", None);
        cache.refresh(&q, &[entry("P1", "https://d/p1.pdf")]).await;
        cache.refresh(&q, &[entry("P2", "https://d/p2.pdf")]).await;

        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_query_change_rebuilds() {
        let cache = DocumentCache::new();
        cache
            .refresh(&query("H2 Economics", None), &[entry("P1", "https://d/p1.pdf")])
            .await;
        cache
            .refresh(&query("H1 Chemistry", None), &[entry("C1", "https://d/c1.pdf")])
            .await;

        assert!(cache.resolve("P1").await.is_none());
        assert!(cache.resolve("C1").await.is_some());
        assert_eq!(cache.query().await.unwrap().subject(), "H1 Chemistry");
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = DocumentCache::new();
        cache
            .refresh(&query("H2 Economics", None), &[entry("P1", "https://d/p1.pdf")])
            .await;
        cache.clear().await;
        assert!(cache.is_empty().await);
        assert!(cache.query().await.is_none());
    }
}
