//! Error types for E2E testing

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An expected-vs-actual mismatch reported by an assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// What was checked, e.g. "response status"
    pub subject: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionFailure {
    pub fn new(subject: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  Expected: {}\n  Received: {}",
            self.subject, self.expected, self.actual
        )
    }
}

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Assertion failed: {0}")]
    Assertion(AssertionFailure),

    #[error("Locator '{selector}' matched {matched} element(s) after {waited_ms} ms (expected exactly 1)")]
    Locator {
        selector: String,
        matched: usize,
        waited_ms: u64,
    },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Page {operation} failed: {reason}")]
    PageUnavailable { operation: String, reason: String },

    #[error("No page loaded: navigate before querying the page")]
    NotNavigated,

    #[error("Screenshot {path} could not be written: {reason}")]
    ArtifactWrite { path: PathBuf, reason: String },

    #[error("Screenshot {path} is not a valid image: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("Not supported by the {backend} backend: {operation}")]
    Unsupported { backend: String, operation: String },

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// How a failure is reported: test failures vs. harness problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Assertion,
    Locator,
    Navigation,
    Artifact,
    Timeout,
    Harness,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Assertion => "assertion",
            FailureKind::Locator => "locator",
            FailureKind::Navigation => "navigation",
            FailureKind::Artifact => "artifact",
            FailureKind::Timeout => "timeout",
            FailureKind::Harness => "harness",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl E2eError {
    /// Classify this error for reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::Assertion(_) => FailureKind::Assertion,
            E2eError::Locator { .. } | E2eError::InvalidSelector { .. } => FailureKind::Locator,
            E2eError::Navigation { .. } | E2eError::NotNavigated | E2eError::PageUnavailable { .. } => {
                FailureKind::Navigation
            }
            E2eError::ArtifactWrite { .. } | E2eError::InvalidArtifact { .. } => FailureKind::Artifact,
            E2eError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Harness,
        }
    }

    /// Whether re-reading the page may succeed, e.g. while a redirect settles
    pub fn is_transient(&self) -> bool {
        matches!(self, E2eError::PageUnavailable { .. })
    }

    /// The expected/actual pair, for assertion failures
    pub fn assertion(&self) -> Option<&AssertionFailure> {
        match self {
            E2eError::Assertion(failure) => Some(failure),
            _ => None,
        }
    }
}
