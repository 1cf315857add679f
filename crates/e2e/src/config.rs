//! Harness configuration: defaults, TOML file, environment overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::server::ServerConfig;

/// Environment variable holding the base URL of the instance under test
pub const BASE_URL_ENV: &str = "GITEA_URL";

/// Set by CI systems; enables the CI retry policy
pub const CI_ENV: &str = "CI";

/// Retries applied when running under CI
pub const CI_RETRIES: u32 = 2;

/// Which browsing context implementation runs the scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Real browser via a Playwright driver process
    #[default]
    Playwright,
    /// Plain HTTP + HTML parsing, no screenshots
    Http,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Playwright => "playwright",
            Backend::Http => "http",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playwright" => Ok(Backend::Playwright),
            "http" => Ok(Backend::Http),
            other => Err(E2eError::Config(format!("unknown backend: {}", other))),
        }
    }
}

/// Wait budgets. All values in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for a single navigation
    pub navigation_ms: u64,

    /// Budget for an auto-retrying assertion (title, locator)
    pub expect_ms: u64,

    /// Delay between locator/title re-evaluations
    pub poll_interval_ms: u64,

    /// Budget for one whole test attempt
    pub test_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            expect_ms: 5_000,
            poll_interval_ms: 100,
            test_ms: 60_000,
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn test(&self) -> Duration {
        Duration::from_millis(self.test_ms)
    }
}

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL relative scenario paths resolve against
    pub base_url: String,

    pub backend: Backend,

    /// Output directory for screenshots and results
    pub output_dir: PathBuf,

    /// Extra attempts for a failed test
    pub retries: u32,

    pub timeouts: TimeoutConfig,

    pub playwright: PlaywrightConfig,

    /// Server to spawn before running (None = use an already running instance)
    pub server: Option<ServerConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            backend: Backend::Playwright,
            output_dir: PathBuf::from("test-results"),
            retries: 0,
            timeouts: TimeoutConfig::default(),
            playwright: PlaywrightConfig::default(),
            server: None,
        }
    }
}

impl HarnessConfig {
    /// Parse a config from a TOML string
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        toml::from_str(content).map_err(E2eError::from)
    }

    /// Load configuration: defaults, then the file (if any), then the environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(path)?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `GITEA_URL` and `CI` overrides using the given lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Base URL overridden by {}: {}", BASE_URL_ENV, url);
            self.base_url = url.trim().to_string();
        }

        let in_ci = lookup(CI_ENV)
            .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false);
        if in_ci && self.retries == 0 {
            self.retries = CI_RETRIES;
        }
    }

    /// Check the config for values that would make every run fail
    pub fn validate(&self) -> E2eResult<()> {
        let url = self.base_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(E2eError::Config(format!(
                "base_url must be http(s), got {}",
                self.base_url
            )));
        }

        let t = &self.timeouts;
        if t.navigation_ms == 0 || t.expect_ms == 0 || t.test_ms == 0 {
            return Err(E2eError::Config("timeouts must be non-zero".to_string()));
        }
        if t.poll_interval_ms == 0 || t.poll_interval_ms > t.expect_ms {
            return Err(E2eError::Config(format!(
                "poll_interval_ms must be in 1..={}",
                t.expect_ms
            )));
        }
        Ok(())
    }

    /// The parsed base URL
    pub fn base_url(&self) -> E2eResult<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| E2eError::Config(format!("invalid base_url '{}': {}", self.base_url, e)))
    }
}
