//! Chromium backend for [`BrowserSession`] via chromiumoxide.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::{Anchor, BrowserLauncher, BrowserSession, NextControl, SessionError};

/// Environment variable overriding Chrome discovery.
pub const CHROME_PATH_ENV: &str = "EXAMBANK_CHROME_PATH";

/// Locates a Chrome or Chromium binary.
///
/// Checks [`CHROME_PATH_ENV`] first, then the usual executable names on `PATH`.
#[must_use]
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CHROME_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %p, "{CHROME_PATH_ENV} does not exist; falling back to PATH");
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    chrome_path: Option<PathBuf>,
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromiumLauncher {
    /// Headless launcher using [`find_chromium`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            headless: true,
            chrome_path: None,
        }
    }

    /// Shows the browser window.
    #[must_use]
    pub fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Uses an explicit browser binary.
    #[must_use]
    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let chrome_path = self
            .chrome_path
            .clone()
            .or_else(find_chromium)
            .ok_or_else(|| {
                SessionError::launch(format!(
                    "Chrome/Chromium not found; install it or set {CHROME_PATH_ENV}"
                ))
            })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SessionError::launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(SessionError::launch)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!(error = %error, "browser handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(SessionError::launch)?;

        info!(path = %chrome_path.display(), headless = self.headless, "browser launched");
        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler,
        }))
    }
}

/// One Chromium process with a single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    async fn eval<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        script: String,
    ) -> Result<T, SessionError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| SessionError::operation(operation, e))?
            .into_value()
            .map_err(|e| SessionError::operation(operation, e))
    }
}

/// Quotes `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Expression yielding the pager's "Next" element, or `undefined`.
const FIND_NEXT: &str = r#"Array.from(document.querySelectorAll('button, a, [role="button"]'))
    .find(el => {
        const name = (el.getAttribute('aria-label') || el.innerText || '').trim().toLowerCase();
        return name === 'next' || name.startsWith('next ');
    })"#;

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SessionError::operation("navigate", e))?;
        Ok(())
    }

    async fn count_elements(&mut self, selector: &str) -> Result<usize, SessionError> {
        let script = format!("document.querySelectorAll({}).length", js_string(selector));
        self.eval("count", script).await
    }

    async fn anchors(&mut self, selector: &str) -> Result<Vec<Anchor>, SessionError> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(a => ({{ href: a.getAttribute('href'), text: a.innerText || '' }}))",
            js_string(selector)
        );
        self.eval("anchors", script).await
    }

    async fn next_control(&mut self) -> Result<NextControl, SessionError> {
        let script = format!(
            "(() => {{ const el = {FIND_NEXT}; if (!el) return 'absent'; \
             return (el.disabled || el.getAttribute('aria-disabled') === 'true') ? 'disabled' : 'enabled'; }})()"
        );
        self.eval("next_control", script).await
    }

    async fn click_next(&mut self) -> Result<(), SessionError> {
        let script = format!("(() => {{ const el = {FIND_NEXT}; if (!el) return false; el.click(); return true; }})()");
        let clicked: bool = self.eval("click_next", script).await?;
        if clicked {
            Ok(())
        } else {
            Err(SessionError::operation("click_next", "Next control disappeared"))
        }
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(|e| SessionError::operation("current_url", e))?
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let Self {
            mut browser,
            page,
            handler,
        } = *self;

        if let Err(error) = page.close().await {
            debug!(error = %error, "page close failed");
        }
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| SessionError::operation("close", e));
        if let Err(error) = browser.wait().await {
            debug!(error = %error, "waiting for browser exit failed");
        }
        handler.abort();
        closed
    }
}
