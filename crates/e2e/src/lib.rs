//! Gitea E2E Smoke Checks
//!
//! This crate provides a Rust-controlled E2E harness that:
//! - Optionally spawns the Gitea server as a subprocess
//! - Controls a browser through a Playwright driver speaking JSON lines
//! - Runs declarative YAML scenarios, fail-fast, with auto-waiting assertions
//! - Validates the screenshots it captures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle | wait_until_reachable│
//! │    ├── ContextFactory::open() -> Box<dyn BrowsingContext>   │
//! │    │     ├── PlaywrightContext (node + playwright)          │
//! │    │     └── HttpContext (reqwest + scraper)                │
//! │    ├── run_scenario(&Scenario) -> TestResult                │
//! │    └── artifact::inspect(screenshot) -> ScreenshotArtifact  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    └── steps: [Step]                                        │
//! │          ├── goto { path }                                  │
//! │          ├── expect_status { status }                       │
//! │          ├── expect_title { pattern }                       │
//! │          ├── expect_attribute { selector, name, value }     │
//! │          └── screenshot { path, full_page }                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The built-in [`homepage::scenario`] checks that `/` answers 200, the title
//! matches `^Gitea: Git with a cup of tea\s*$`, the single `.logo` has
//! `src="/assets/img/logo.svg"`, and captures `screenshot.png`.

pub mod artifact;
pub mod config;
pub mod context;
pub mod error;
pub mod expect;
pub mod homepage;
pub mod http;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod server;

pub use config::{Backend, HarnessConfig};
pub use context::BrowsingContext;
pub use error::{E2eError, E2eResult, FailureKind};
pub use runner::{TestResult, TestRunner, TestSuiteResult};
pub use scenario::{Scenario, Step};
