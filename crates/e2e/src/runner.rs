//! Main test runner that orchestrates the server, browsing contexts and reports

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifact::{self, ScreenshotArtifact};
use crate::config::HarnessConfig;
use crate::context::{open_context, BrowsingContext, PageResponse};
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::expect::Expect;
use crate::scenario::{Scenario, Step};
use crate::server::{wait_until_reachable, ServerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// Result of executing a scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub backend: String,
    /// Attempts made, including retries
    pub attempts: u32,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub artifacts: Vec<ScreenshotArtifact>,
    pub failure_kind: Option<FailureKind>,
    pub error: Option<String>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Creates a fresh browsing context for every test attempt
#[async_trait]
pub trait ContextFactory: Send + Sync {
    async fn open(&self, config: &HarnessConfig) -> E2eResult<Box<dyn BrowsingContext>>;
}

/// Opens the backend named in the config
pub struct BackendFactory;

#[async_trait]
impl ContextFactory for BackendFactory {
    async fn open(&self, config: &HarnessConfig) -> E2eResult<Box<dyn BrowsingContext>> {
        open_context(config).await
    }
}

/// Mutable state while one attempt executes
#[derive(Default)]
struct Attempt {
    steps: Vec<StepResult>,
    artifacts: Vec<ScreenshotArtifact>,
    response: Option<PageResponse>,
    /// Label and start of the step in flight
    current: Option<(String, Instant)>,
}

impl Attempt {
    fn record_failure(&mut self, step_name: String, duration_ms: u64, e: &E2eError) {
        let failure = e.assertion();
        self.steps.push(StepResult {
            step_name,
            status: StepStatus::Failed,
            duration_ms,
            error: Some(e.to_string()),
            failure_kind: Some(e.kind()),
            expected: failure.map(|f| f.expected.clone()),
            actual: failure.map(|f| f.actual.clone()),
        });
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: HarnessConfig,

    factory: Box<dyn ContextFactory>,

    /// Running server handle (if any)
    server: Option<ServerHandle>,
}

impl TestRunner {
    /// Create a runner that opens contexts for the configured backend
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_factory(config, Box::new(BackendFactory))
    }

    /// Create a runner with a custom context factory
    pub fn with_factory(config: HarnessConfig, factory: Box<dyn ContextFactory>) -> Self {
        Self {
            config,
            factory,
            server: None,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Spawn the configured server, or wait for the external one
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }

        match self.config.server.clone() {
            Some(server_config) => {
                let server = ServerHandle::spawn(server_config).await?;
                self.config.base_url = server.base_url().to_string();
                self.server = Some(server);
            }
            None => {
                wait_until_reachable(&self.config.base_url, self.config.timeouts.navigation()).await?;
            }
        }
        Ok(())
    }

    /// Stop the server
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Run a list of scenarios in order
    pub async fn run_scenarios(&mut self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} test(s) against {}", scenarios.len(), self.config.base_url);

        for scenario in scenarios {
            let result = self.run_scenario(scenario).await?;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} [{}] - {}",
                    result.name,
                    result.failure_kind.map(|k| k.as_str()).unwrap_or("unknown"),
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!("");
        info!("Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms);

        Ok(suite)
    }

    /// Run one scenario, retrying failed attempts in fresh contexts
    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<TestResult> {
        scenario.validate()?;

        let start = Instant::now();
        let max_attempts = self.config.retries + 1;
        let output_dir = self.scenario_output_dir(scenario)?;

        let mut attempt_no = 1;
        loop {
            debug!("Running test: {} (attempt {}/{})", scenario.name, attempt_no, max_attempts);

            let mut ctx = self.factory.open(&self.config).await?;
            let backend = ctx.backend().to_string();

            let mut attempt = Attempt::default();
            let outcome = tokio::time::timeout(
                self.config.timeouts.test(),
                self.execute_steps(ctx.as_mut(), scenario, &output_dir, &mut attempt),
            )
            .await;
            let outcome = outcome.unwrap_or_else(|_| {
                let err = match attempt.current.take() {
                    Some((label, started)) => {
                        let err = E2eError::Timeout(format!(
                            "test '{}' exceeded {} ms during step {}",
                            scenario.name, self.config.timeouts.test_ms, label
                        ));
                        attempt.record_failure(label, started.elapsed().as_millis() as u64, &err);
                        err
                    }
                    None => E2eError::Timeout(format!(
                        "test '{}' exceeded {} ms",
                        scenario.name, self.config.timeouts.test_ms
                    )),
                };
                Err(err)
            });

            if let Err(e) = ctx.close().await {
                warn!("Failed to close {} context: {}", backend, e);
            }

            if outcome.is_ok() || attempt_no >= max_attempts {
                return Ok(TestResult {
                    name: scenario.name.clone(),
                    success: outcome.is_ok(),
                    backend,
                    attempts: attempt_no,
                    duration_ms: start.elapsed().as_millis() as u64,
                    steps: attempt.steps,
                    artifacts: attempt.artifacts,
                    failure_kind: outcome.as_ref().err().map(E2eError::kind),
                    error: outcome.err().map(|e| e.to_string()),
                });
            }

            if let Err(e) = &outcome {
                warn!("{} failed on attempt {}: {} - retrying", scenario.name, attempt_no, e);
            }
            attempt_no += 1;
        }
    }

    /// Execute steps in order, stopping at the first failure
    async fn execute_steps(
        &self,
        ctx: &mut dyn BrowsingContext,
        scenario: &Scenario,
        output_dir: &Path,
        attempt: &mut Attempt,
    ) -> E2eResult<()> {
        let expect = Expect::from_config(&self.config.timeouts);

        for step in &scenario.steps {
            let started = Instant::now();
            attempt.current = Some((step.label(), started));
            let result = self.execute_step(ctx, &expect, step, output_dir, attempt).await;
            attempt.current = None;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => attempt.steps.push(StepResult {
                    step_name: step.label(),
                    status: StepStatus::Passed,
                    duration_ms,
                    error: None,
                    failure_kind: None,
                    expected: None,
                    actual: None,
                }),
                Err(e) => {
                    attempt.record_failure(step.label(), duration_ms, &e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn execute_step(
        &self,
        ctx: &mut dyn BrowsingContext,
        expect: &Expect,
        step: &Step,
        output_dir: &Path,
        attempt: &mut Attempt,
    ) -> E2eResult<()> {
        debug!("Executing step: {}", step.label());

        match step {
            Step::Goto { path } => {
                attempt.response = ctx.goto(path).await?;
            }
            Step::ExpectStatus { status } => {
                expect.status(attempt.response.as_ref(), *status)?;
            }
            Step::ExpectTitle { pattern } => {
                let pattern = Regex::new(pattern)
                    .map_err(|e| E2eError::Scenario(format!("invalid title pattern: {}", e)))?;
                expect.title_matches(ctx, &pattern).await?;
            }
            Step::ExpectAttribute { selector, name, value } => {
                expect.attribute(ctx, selector, name, value).await?;
            }
            Step::Screenshot { path, full_page } => {
                let target = output_dir.join(path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| E2eError::ArtifactWrite {
                        path: target.clone(),
                        reason: e.to_string(),
                    })?;
                }

                ctx.screenshot(&target, *full_page).await.map_err(|e| match e {
                    E2eError::Unsupported { backend, .. } => E2eError::ArtifactWrite {
                        path: target.clone(),
                        reason: format!("the {} backend cannot capture pages", backend),
                    },
                    e => e,
                })?;

                let artifact = artifact::inspect(&target)?;
                info!("Screenshot saved: {}", artifact.path.display());
                attempt.artifacts.push(artifact);
            }
        }
        Ok(())
    }

    /// `<output_dir>/<scenario name>`, absolute so backends with their own
    /// working directory write to the same place
    fn scenario_output_dir(&self, scenario: &Scenario) -> E2eResult<PathBuf> {
        let base = if self.config.output_dir.is_absolute() {
            self.config.output_dir.clone()
        } else {
            std::env::current_dir()?.join(&self.config.output_dir)
        };
        Ok(base.join(&scenario.name))
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}
