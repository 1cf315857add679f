//! Browserless context: plain HTTP fetch plus HTML parsing
//!
//! Useful for fast static checks of server-rendered pages. Nothing runs
//! client-side, so the DOM is exactly what the server sent.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

use crate::context::{resolve_url, BrowsingContext, ElementQuery, PageResponse};
use crate::error::{E2eError, E2eResult};

/// `BrowsingContext` over `reqwest` and `scraper`
pub struct HttpContext {
    client: reqwest::Client,
    base_url: Url,
    /// Body of the last loaded page
    document: Option<String>,
}

impl HttpContext {
    pub fn new(base_url: Url, navigation_timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(navigation_timeout)
            .user_agent(concat!("gitea-e2e/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            document: None,
        })
    }

    fn document(&self) -> E2eResult<Html> {
        self.document
            .as_deref()
            .map(Html::parse_document)
            .ok_or(E2eError::NotNavigated)
    }
}

/// `document.title` semantics: strip and collapse ASCII whitespace
fn normalize_title(raw: &str) -> String {
    raw.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(selector: &str) -> E2eResult<Selector> {
    Selector::parse(selector).map_err(|e| E2eError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Title of a parsed document, empty when there is no `<title>`
pub fn document_title(html: &Html) -> String {
    let raw = match Selector::parse("title") {
        Ok(sel) => html
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default(),
        Err(_) => String::new(),
    };
    normalize_title(&raw)
}

/// Evaluate a selector against a parsed document
pub fn query_document(html: &Html, selector: &str, attribute: Option<&str>) -> E2eResult<ElementQuery> {
    let sel = parse_selector(selector)?;
    let matches: Vec<_> = html.select(&sel).collect();
    let values = match attribute {
        Some(name) => matches
            .iter()
            .map(|el| el.value().attr(name).map(String::from))
            .collect(),
        None => Vec::new(),
    };
    Ok(ElementQuery {
        count: matches.len(),
        values,
    })
}

#[async_trait]
impl BrowsingContext for HttpContext {
    async fn goto(&mut self, path: &str) -> E2eResult<Option<PageResponse>> {
        let url = resolve_url(&self.base_url, path)?;
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| E2eError::Navigation {
                url: url.to_string(),
                reason: if e.is_timeout() {
                    "navigation timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| E2eError::Navigation {
            url: url.to_string(),
            reason: format!("failed to read body: {}", e),
        })?;

        self.document = Some(body);
        Ok(Some(PageResponse { url: final_url, status }))
    }

    async fn title(&mut self) -> E2eResult<String> {
        let html = self.document()?;
        Ok(document_title(&html))
    }

    async fn query(&mut self, selector: &str, attribute: Option<&str>) -> E2eResult<ElementQuery> {
        let html = self.document()?;
        query_document(&html, selector, attribute)
    }

    async fn screenshot(&mut self, _path: &Path, _full_page: bool) -> E2eResult<()> {
        Err(E2eError::Unsupported {
            backend: self.backend().to_string(),
            operation: "screenshot".to_string(),
        })
    }

    fn backend(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>
    Gitea: Git with a cup of tea
</title></head>
<body>
  <div class="ui container">
    <img class="logo" width="220" height="220" src="/assets/img/logo.svg">
    <img class="avatar" src="/avatar.png">
    <a class="item" href="/explore">Explore</a>
  </div>
</body>
</html>"#;

    #[test]
    fn test_title_uses_document_title_semantics() {
        let html = Html::parse_document(PAGE);
        assert_eq!(document_title(&html), "Gitea: Git with a cup of tea");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let html = Html::parse_document("<html><body></body></html>");
        assert_eq!(document_title(&html), "");
    }

    #[test]
    fn test_query_reads_attribute() {
        let html = Html::parse_document(PAGE);
        let query = query_document(&html, ".logo", Some("src")).unwrap();
        assert_eq!(query.count, 1);
        assert_eq!(query.single_value(), Some(Some("/assets/img/logo.svg")));

        let missing = query_document(&html, ".logo", Some("alt")).unwrap();
        assert_eq!(missing.single_value(), Some(None));

        let none = query_document(&html, ".navbar", None).unwrap();
        assert_eq!(none.count, 0);
    }

    #[test]
    fn test_invalid_selector() {
        let html = Html::parse_document(PAGE);
        let err = query_document(&html, "..logo", None).unwrap_err();
        assert!(matches!(err, E2eError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn test_query_before_navigation() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let mut ctx = HttpContext::new(base, Duration::from_secs(1)).unwrap();
        assert!(matches!(ctx.title().await, Err(E2eError::NotNavigated)));
    }
}
