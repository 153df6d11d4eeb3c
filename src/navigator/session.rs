//! Browser automation seam.
//!
//! The navigator only needs a handful of primitives from a browser; they are
//! defined here so the Chromium backend can be swapped for a scripted one in
//! tests. Waiting is built on top of these primitives in [`super::wait`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An anchor element as seen in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Raw `href` attribute, if present.
    pub href: Option<String>,
    /// Visible (inner) text.
    pub text: String,
}

/// State of the results pager's "Next" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextControl {
    /// No "Next" control on the page.
    Absent,
    /// Present but disabled (last page).
    Disabled,
    /// Present and clickable.
    Enabled,
}

/// Errors reported by a browser backend.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser could not be started.
    #[error("failed to launch browser: {reason}")]
    Launch {
        /// Backend error text.
        reason: String,
    },

    /// A page operation failed.
    #[error("browser {operation} failed: {reason}")]
    Operation {
        /// Primitive that failed (`navigate`, `click`, ...).
        operation: &'static str,
        /// Backend error text.
        reason: String,
    },
}

impl SessionError {
    /// Creates a launch error.
    pub fn launch(reason: impl ToString) -> Self {
        Self::Launch {
            reason: reason.to_string(),
        }
    }

    /// Creates an operation error.
    pub fn operation(operation: &'static str, reason: impl ToString) -> Self {
        Self::Operation {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// One exclusively-owned browser page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Loads `url` in the page. Callers bound this with their own timeout.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Number of elements currently matching `selector`.
    async fn count_elements(&mut self, selector: &str) -> Result<usize, SessionError>;

    /// `href` and inner text of every anchor matching `selector`, in document order.
    async fn anchors(&mut self, selector: &str) -> Result<Vec<Anchor>, SessionError>;

    /// State of the pager's "Next" control.
    async fn next_control(&mut self) -> Result<NextControl, SessionError>;

    /// Clicks the pager's "Next" control.
    async fn click_next(&mut self) -> Result<(), SessionError>;

    /// The page's current URL.
    async fn current_url(&mut self) -> Result<String, SessionError>;

    /// Releases the page and its browser.
    async fn close(self: Box<Self>) -> Result<(), SessionError>;
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a fresh session.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}
