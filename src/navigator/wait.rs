//! Bounded wait-for-condition primitives.
//!
//! A wait polls its condition until it holds or the deadline passes. There are
//! no fixed sleeps: a satisfied condition returns on the first poll.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use super::session::{BrowserSession, SessionError};
use super::site::page_index;

/// What a wait is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition<'a> {
    /// At least one element matches the selector.
    ElementsPresent(&'a str),
    /// The page URL names the given results page.
    OnPage(u32),
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition held before the deadline.
    Satisfied,
    /// The deadline passed first.
    TimedOut,
}

impl Condition<'_> {
    async fn holds(&self, session: &mut dyn BrowserSession) -> Result<bool, SessionError> {
        match self {
            Self::ElementsPresent(selector) => Ok(session.count_elements(selector).await? > 0),
            Self::OnPage(page) => {
                let url = session.current_url().await?;
                Ok(page_index(&url) == Some(*page))
            }
        }
    }
}

/// Suspends until `condition` holds or `timeout` elapses, polling every `poll`.
///
/// The condition is always checked at least once, and once more at the deadline.
///
/// # Errors
///
/// Propagates the first [`SessionError`] raised while checking the condition.
pub async fn wait_for(
    session: &mut dyn BrowserSession,
    condition: Condition<'_>,
    timeout: Duration,
    poll: Duration,
) -> Result<WaitOutcome, SessionError> {
    let deadline = Instant::now() + timeout;
    loop {
        if condition.holds(session).await? {
            return Ok(WaitOutcome::Satisfied);
        }
        let now = Instant::now();
        if now >= deadline {
            trace!(?condition, timeout_ms = timeout.as_millis(), "wait timed out");
            return Ok(WaitOutcome::TimedOut);
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}
