//! Browsing context abstraction shared by all backends

use std::path::Path;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::{Backend, HarnessConfig};
use crate::error::{E2eError, E2eResult};
use crate::http::HttpContext;
use crate::playwright::PlaywrightContext;

/// Response descriptor for a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
}

/// One evaluation of a locator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    /// Number of matching elements
    pub count: usize,

    /// Requested attribute of each match, in document order
    #[serde(default)]
    pub values: Vec<Option<String>>,
}

impl ElementQuery {
    /// The attribute value when exactly one element matched
    pub fn single_value(&self) -> Option<Option<&str>> {
        if self.count != 1 {
            return None;
        }
        Some(self.values.first().and_then(|v| v.as_deref()))
    }
}

/// An isolated page the harness drives for one test attempt.
///
/// Every call suspends until the backend finishes the operation.
#[async_trait]
pub trait BrowsingContext: Send {
    /// Navigate to `path` (relative to the base URL). `None` means the
    /// navigation produced no response.
    async fn goto(&mut self, path: &str) -> E2eResult<Option<PageResponse>>;

    /// Current document title
    async fn title(&mut self) -> E2eResult<String>;

    /// Evaluate `selector` once, optionally reading `attribute` from each match
    async fn query(&mut self, selector: &str, attribute: Option<&str>) -> E2eResult<ElementQuery>;

    /// Capture the page into `path`
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> E2eResult<()>;

    /// Release the context
    async fn close(&mut self) -> E2eResult<()> {
        Ok(())
    }

    /// Backend name for logs and reports
    fn backend(&self) -> &'static str;
}

/// Resolve a scenario path against the base URL
pub fn resolve_url(base: &Url, path: &str) -> E2eResult<Url> {
    base.join(path).map_err(|e| E2eError::Navigation {
        url: format!("{}{}", base, path),
        reason: e.to_string(),
    })
}

/// Open a fresh context for the configured backend
pub async fn open_context(config: &HarnessConfig) -> E2eResult<Box<dyn BrowsingContext>> {
    let base_url = config.base_url()?;
    match config.backend {
        Backend::Playwright => {
            let ctx = PlaywrightContext::launch(base_url, config.playwright.clone(), &config.timeouts).await?;
            Ok(Box::new(ctx))
        }
        Backend::Http => {
            let ctx = HttpContext::new(base_url, config.timeouts.navigation())?;
            Ok(Box::new(ctx))
        }
    }
}
