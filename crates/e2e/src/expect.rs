//! Assertions with auto-wait
//!
//! Status checks are one-shot. Title and attribute checks re-evaluate the
//! page every `poll_interval` until they hold or `timeout` elapses, and then
//! report the last observed value. Transient page errors are retried within
//! the same budget; the last one is reported if it never clears.

use std::time::Duration;

use regex::Regex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::TimeoutConfig;
use crate::context::{BrowsingContext, PageResponse};
use crate::error::{AssertionFailure, E2eError, E2eResult};

/// Shown as the actual value when navigation produced no response
pub const NO_RESPONSE: &str = "<no response>";

/// Shown as the actual value when the attribute is absent
pub const MISSING_ATTRIBUTE: &str = "<missing>";

#[derive(Debug, Clone, Copy)]
pub struct Expect {
    timeout: Duration,
    poll_interval: Duration,
}

/// What the last locator evaluation saw
enum Observed {
    Count(usize),
    Value(Option<String>),
}

impl Expect {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(timeouts: &TimeoutConfig) -> Self {
        Self::new(timeouts.expect(), timeouts.poll_interval())
    }

    /// Assert the navigation response has exactly `expected` status
    pub fn status(&self, response: Option<&PageResponse>, expected: u16) -> E2eResult<()> {
        match response {
            Some(resp) if resp.status == expected => Ok(()),
            Some(resp) => Err(E2eError::Assertion(AssertionFailure::new(
                "response status",
                expected.to_string(),
                resp.status.to_string(),
            ))),
            None => Err(E2eError::Assertion(AssertionFailure::new(
                "response status",
                expected.to_string(),
                NO_RESPONSE,
            ))),
        }
    }

    /// Assert the page title matches `pattern`, retrying until it does
    pub async fn title_matches(&self, ctx: &mut dyn BrowsingContext, pattern: &Regex) -> E2eResult<String> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let title = match ctx.title().await {
                Ok(title) => title,
                Err(e) if e.is_transient() && Instant::now() < deadline => {
                    debug!("Title unavailable, retrying: {}", e);
                    sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            if pattern.is_match(&title) {
                return Ok(title);
            }
            if Instant::now() >= deadline {
                return Err(E2eError::Assertion(AssertionFailure::new(
                    "page title",
                    format!("/{}/", pattern.as_str()),
                    format!("{:?}", title),
                )));
            }
            debug!("Title {:?} does not match yet", title);
            sleep(self.poll_interval).await;
        }
    }

    /// Assert `selector` resolves to exactly one element whose `name`
    /// attribute equals `expected`
    pub async fn attribute(
        &self,
        ctx: &mut dyn BrowsingContext,
        selector: &str,
        name: &str,
        expected: &str,
    ) -> E2eResult<()> {
        let start = Instant::now();
        let deadline = start + self.timeout;

        let observed = loop {
            let query = match ctx.query(selector, Some(name)).await {
                Ok(query) => query,
                Err(e) if e.is_transient() && Instant::now() < deadline => {
                    debug!("Locator '{}' unavailable, retrying: {}", selector, e);
                    sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let observed = match query.single_value() {
                Some(Some(value)) if value == expected => return Ok(()),
                Some(value) => Observed::Value(value.map(String::from)),
                None => Observed::Count(query.count),
            };
            if Instant::now() >= deadline {
                break observed;
            }
            sleep(self.poll_interval).await;
        };

        match observed {
            Observed::Count(matched) => Err(E2eError::Locator {
                selector: selector.to_string(),
                matched,
                waited_ms: start.elapsed().as_millis() as u64,
            }),
            Observed::Value(actual) => Err(E2eError::Assertion(AssertionFailure::new(
                format!("attribute '{}' of '{}'", name, selector),
                expected,
                actual.as_deref().unwrap_or(MISSING_ATTRIBUTE),
            ))),
        }
    }
}
