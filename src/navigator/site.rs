//! Where the library lives and what its document links look like.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::query::Query;

/// Library listing page.
pub const DEFAULT_LIBRARY_URL: &str = "https://grail.moe/library";

/// Every downloadable document link starts with this prefix.
pub const DEFAULT_DOCUMENT_PREFIX: &str = "https://document.grail.moe/";

/// Query parameter carrying the 1-indexed results page.
pub const PAGE_PARAM: &str = "page";

/// Listing URL and document-link pattern of the library site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Listing page the filters are appended to.
    pub library_url: String,
    /// Absolute URL prefix of document links.
    pub document_prefix: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            library_url: DEFAULT_LIBRARY_URL.to_string(),
            document_prefix: DEFAULT_DOCUMENT_PREFIX.to_string(),
        }
    }
}

impl SiteProfile {
    /// Builds the filtered listing URL for `query`.
    ///
    /// Absent filters are omitted; values are form-encoded, so spaces become `+`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `library_url` is not an absolute URL.
    pub fn listing_url(&self, query: &Query) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.library_url)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = query.category() {
                pairs.append_pair("category", category);
            }
            pairs.append_pair("subject", query.subject());
            if let Some(year) = query.year() {
                pairs.append_pair("year", &year.to_string());
            }
            if let Some(document_type) = query.document_type() {
                pairs.append_pair("doc_type", document_type);
            }
        }
        Ok(url)
    }

    /// CSS selector matching document anchors.
    #[must_use]
    pub fn document_selector(&self) -> String {
        format!(r#"a[href^="{}"][href$=".pdf"]"#, self.document_prefix)
    }

    /// Whether `href` is a document link on this site.
    #[must_use]
    pub fn is_document_link(&self, href: &str) -> bool {
        href.starts_with(&self.document_prefix) && href.ends_with(".pdf")
    }
}

/// Returns the results page a listing URL points at, if it names one.
#[must_use]
pub fn page_index(url: &str) -> Option<u32> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == PAGE_PARAM)
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::QueryParams;

    fn query(year: Option<u16>) -> Query {
        QueryParams {
            category: "GCE 'A' Levels".to_string(),
            subject: "H2 Economics".to_string(),
            year,
            ..QueryParams::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_listing_url_encodes_spaces_as_plus() {
        let url = SiteProfile::default().listing_url(&query(None)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://grail.moe/library?category=GCE+%27A%27+Levels&subject=H2+Economics&doc_type=Exam+Papers"
        );
    }

    #[test]
    fn test_listing_url_includes_year_when_present() {
        let url = SiteProfile::default().listing_url(&query(Some(2021))).unwrap();
        assert!(url.as_str().contains("&year=2021&"), "{url}");
    }

    #[test]
    fn test_listing_url_omits_absent_filters() {
        let query = QueryParams {
            subject: "H1 Chemistry".to_string(),
            document_type: String::new(),
            ..QueryParams::default()
        }
        .validate()
        .unwrap();
        let url = SiteProfile::default().listing_url(&query).unwrap();
        assert_eq!(url.query(), Some("subject=H1+Chemistry"));
    }

    #[test]
    fn test_listing_url_rejects_relative_base() {
        let site = SiteProfile {
            library_url: "/library".to_string(),
            ..SiteProfile::default()
        };
        assert!(site.listing_url(&query(None)).is_err());
    }

    #[test]
    fn test_document_selector_and_filter() {
        let site = SiteProfile::default();
        assert_eq!(
            site.document_selector(),
            r#"a[href^="https://document.grail.moe/"][href$=".pdf"]"#
        );
        assert!(site.is_document_link("https://document.grail.moe/abc/2023_P1.pdf"));
        assert!(!site.is_document_link("https://grail.moe/library?page=2"));
        assert!(!site.is_document_link("https://document.grail.moe/abc/notes.docx"));
    }

    #[test]
    fn test_page_index_reads_query() {
        assert_eq!(page_index("https://grail.moe/library?subject=X&page=3"), Some(3));
        assert_eq!(page_index("https://grail.moe/library?subject=X"), None);
        assert_eq!(page_index("not a url"), None);
    }
}
