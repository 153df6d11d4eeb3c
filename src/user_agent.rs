//! Shared User-Agent string for document downloads.

/// Default User-Agent for download requests (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("exambank/{version} (question-bank-builder)")
}
