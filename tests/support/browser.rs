//! Scripted in-memory browser for navigator and acquisition tests.
//!
//! A [`ScriptedSite`] is a list of results pages. Each page carries its anchors,
//! the state of its "Next" control and whether clicking "Next" actually moves
//! the URL on (a page that does not move simulates a pagination stall).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use exambank_core::navigator::{Anchor, BrowserLauncher, BrowserSession, NextControl, SessionError};

#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub anchors: Vec<Anchor>,
    pub next: NextControl,
    pub url_advances: bool,
}

impl ScriptedPage {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        Self {
            anchors,
            next: NextControl::Enabled,
            url_advances: true,
        }
    }

    pub fn last(anchors: Vec<Anchor>) -> Self {
        Self {
            next: NextControl::Disabled,
            ..Self::new(anchors)
        }
    }

    pub fn with_next(mut self, next: NextControl) -> Self {
        self.next = next;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.url_advances = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSite {
    pub pages: Vec<ScriptedPage>,
    pub navigate_delay: Option<Duration>,
    pub navigate_error: bool,
    pub launch_error: bool,
}

impl ScriptedSite {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}

/// Anchor pointing at `<base>/<file>`.
pub fn anchor(base: &str, file: &str, text: &str) -> Anchor {
    Anchor {
        href: Some(format!("{}/{file}", base.trim_end_matches('/'))),
        text: text.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    site: Arc<ScriptedSite>,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub visited: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ScriptedLauncher {
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site: Arc::new(site),
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            visited: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().expect("visited lock").clone()
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.site.launch_error {
            return Err(SessionError::launch("no browser in test"));
        }
        Ok(Box::new(ScriptedSession {
            site: Arc::clone(&self.site),
            base_url: String::new(),
            current: 0,
            closes: Arc::clone(&self.closes),
            visited: Arc::clone(&self.visited),
        }))
    }
}

struct ScriptedSession {
    site: Arc<ScriptedSite>,
    base_url: String,
    current: usize,
    closes: Arc<AtomicUsize>,
    visited: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ScriptedSession {
    fn page(&self) -> Option<&ScriptedPage> {
        self.site.pages.get(self.current)
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        if let Some(delay) = self.site.navigate_delay {
            tokio::time::sleep(delay).await;
        }
        if self.site.navigate_error {
            return Err(SessionError::operation("navigate", "net::ERR_NAME_NOT_RESOLVED"));
        }
        self.visited.lock().expect("visited lock").push(url.to_string());
        self.base_url = url.to_string();
        self.current = 0;
        Ok(())
    }

    async fn count_elements(&mut self, _selector: &str) -> Result<usize, SessionError> {
        Ok(self.page().map_or(0, |page| page.anchors.len()))
    }

    async fn anchors(&mut self, _selector: &str) -> Result<Vec<Anchor>, SessionError> {
        Ok(self.page().map(|page| page.anchors.clone()).unwrap_or_default())
    }

    async fn next_control(&mut self) -> Result<NextControl, SessionError> {
        Ok(self.page().map_or(NextControl::Absent, |page| page.next))
    }

    async fn click_next(&mut self) -> Result<(), SessionError> {
        let advances = self.page().is_some_and(|page| page.url_advances);
        if advances {
            self.current += 1;
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        if self.current == 0 {
            Ok(self.base_url.clone())
        } else {
            Ok(format!("{}&page={}", self.base_url, self.current + 1))
        }
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
