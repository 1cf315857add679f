//! Runner behaviour with scripted browsing contexts: screenshots, retries, timeouts

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gitea_e2e::config::{HarnessConfig, TimeoutConfig};
use gitea_e2e::context::{BrowsingContext, ElementQuery, PageResponse};
use gitea_e2e::error::{E2eError, E2eResult, FailureKind};
use gitea_e2e::homepage;
use gitea_e2e::runner::{ContextFactory, StepStatus, TestRunner};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

#[derive(Clone, Copy)]
enum Capture {
    Png,
    Garbage,
    Fail,
}

/// A page that looks like a healthy Gitea homepage
struct FakePage {
    status: u16,
    capture: Capture,
    goto_delay: Duration,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowsingContext for FakePage {
    async fn goto(&mut self, path: &str) -> E2eResult<Option<PageResponse>> {
        tokio::time::sleep(self.goto_delay).await;
        Ok(Some(PageResponse {
            url: format!("http://gitea.test{}", path),
            status: self.status,
        }))
    }

    async fn title(&mut self) -> E2eResult<String> {
        Ok("Gitea: Git with a cup of tea".to_string())
    }

    async fn query(&mut self, _selector: &str, _attribute: Option<&str>) -> E2eResult<ElementQuery> {
        Ok(ElementQuery {
            count: 1,
            values: vec![Some("/assets/img/logo.svg".to_string())],
        })
    }

    async fn screenshot(&mut self, path: &Path, _full_page: bool) -> E2eResult<()> {
        match self.capture {
            Capture::Png => {
                RgbaImage::from_pixel(64, 48, Rgba([255, 255, 255, 255])).save(path)?;
                Ok(())
            }
            Capture::Garbage => {
                std::fs::write(path, b"")?;
                Ok(())
            }
            Capture::Fail => Err(E2eError::ArtifactWrite {
                path: path.to_path_buf(),
                reason: "ENOSPC: no space left on device".to_string(),
            }),
        }
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "fake"
    }
}

/// Hands out pages; the first `failing` pages answer 503
struct FakeFactory {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    failing: usize,
    capture: Capture,
    goto_delay: Duration,
}

impl FakeFactory {
    fn new(capture: Capture) -> Self {
        Self {
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            failing: 0,
            capture,
            goto_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ContextFactory for FakeFactory {
    async fn open(&self, _config: &HarnessConfig) -> E2eResult<Box<dyn BrowsingContext>> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            status: if n < self.failing { 503 } else { 200 },
            capture: self.capture,
            goto_delay: self.goto_delay,
            closed: self.closed.clone(),
        }))
    }
}

fn config(out: &TempDir) -> HarnessConfig {
    HarnessConfig {
        output_dir: out.path().to_path_buf(),
        timeouts: TimeoutConfig {
            navigation_ms: 1_000,
            expect_ms: 100,
            poll_interval_ms: 10,
            test_ms: 2_000,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn passing_run_produces_a_full_page_screenshot() {
    let out = TempDir::new().unwrap();
    let factory = FakeFactory::new(Capture::Png);
    let closed = factory.closed.clone();
    let runner = TestRunner::with_factory(config(&out), Box::new(factory));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Passed));

    let expected = out.path().join("homepage").join(homepage::SCREENSHOT_FILE);
    assert!(expected.exists());
    assert!(std::fs::metadata(&expected).unwrap().len() > 0);

    assert_eq!(result.artifacts.len(), 1);
    let artifact = &result.artifacts[0];
    assert_eq!(artifact.path, expected);
    assert_eq!(artifact.format, "png");
    assert_eq!((artifact.width, artifact.height), (64, 48));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_screenshot_fails_as_artifact() {
    let out = TempDir::new().unwrap();
    let runner = TestRunner::with_factory(config(&out), Box::new(FakeFactory::new(Capture::Garbage)));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Artifact));
    assert_eq!(result.steps.len(), 5);
    assert_eq!(result.steps[4].status, StepStatus::Failed);
}

#[tokio::test]
async fn screenshot_write_error_fails_the_test() {
    let out = TempDir::new().unwrap();
    let runner = TestRunner::with_factory(config(&out), Box::new(FakeFactory::new(Capture::Fail)));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Artifact));
    assert!(result.error.unwrap().contains("ENOSPC"));
}

#[tokio::test]
async fn retry_recovers_in_a_fresh_context() {
    let out = TempDir::new().unwrap();
    let mut factory = FakeFactory::new(Capture::Png);
    factory.failing = 1;
    let opened = factory.opened.clone();
    let closed = factory.closed.clone();

    let mut cfg = config(&out);
    cfg.retries = 2;
    let runner = TestRunner::with_factory(cfg, Box::new(factory));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(opened.load(Ordering::SeqCst), 2);
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn no_retries_by_default() {
    let out = TempDir::new().unwrap();
    let mut factory = FakeFactory::new(Capture::Png);
    factory.failing = 1;
    let opened = factory.opened.clone();
    let runner = TestRunner::with_factory(config(&out), Box::new(factory));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.attempts, 1);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(result.steps[1].actual.as_deref(), Some("503"));
}

#[tokio::test]
async fn slow_navigation_hits_the_test_timeout() {
    let out = TempDir::new().unwrap();
    let mut factory = FakeFactory::new(Capture::Png);
    factory.goto_delay = Duration::from_secs(5);
    let closed = factory.closed.clone();

    let mut cfg = config(&out);
    cfg.timeouts.test_ms = 100;
    let runner = TestRunner::with_factory(cfg, Box::new(factory));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Timeout));
    assert!(result.error.unwrap().contains("during step goto:/"));
    // the interrupted step is reported
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].step_name, "goto:/");
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(result.steps[0].failure_kind, Some(FailureKind::Timeout));
    // the context is still released
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}
