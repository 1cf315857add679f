//! Homepage smoke check against a mock Gitea served by wiremock
//!
//! Uses the browserless HTTP backend so the status, title and logo checks
//! run deterministically without a browser. That backend cannot render, so
//! the screenshot step fails there; passing runs use the checks without it.

use gitea_e2e::config::{Backend, HarnessConfig, TimeoutConfig};
use gitea_e2e::error::FailureKind;
use gitea_e2e::homepage;
use gitea_e2e::runner::{StepStatus, TestRunner};
use gitea_e2e::Scenario;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(title: &str, logos: &[&str]) -> String {
    let imgs: String = logos
        .iter()
        .map(|src| format!(r#"<img class="logo" width="220" height="220" src="{}"/>"#, src))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en-US">
<head><meta charset="utf-8"><title>{}</title></head>
<body><div class="page-content home"><div class="center">{}</div></div></body>
</html>"#,
        title, imgs
    )
}

async fn serve(status: u16, body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(status).set_body_raw(body.into_bytes(), "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    server
}

fn config(base_url: &str, out: &TempDir) -> HarnessConfig {
    HarnessConfig {
        base_url: base_url.to_string(),
        backend: Backend::Http,
        output_dir: out.path().to_path_buf(),
        retries: 0,
        timeouts: TimeoutConfig {
            navigation_ms: 2_000,
            expect_ms: 200,
            poll_interval_ms: 20,
            test_ms: 10_000,
        },
        ..Default::default()
    }
}

const TITLE: &str = "Gitea: Git with a cup of tea";

/// The homepage check without its screenshot step
fn page_checks() -> Scenario {
    let mut scenario = homepage::scenario();
    scenario.steps.pop();
    scenario
}

#[tokio::test]
async fn healthy_homepage_passes_page_checks() {
    let server = serve(200, page(TITLE, &["/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&page_checks()).await.unwrap();

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.backend, "http");
    assert_eq!(result.steps.len(), 4);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Passed));
}

#[tokio::test]
async fn screenshot_without_renderer_is_an_artifact_failure() {
    let server = serve(200, page(TITLE, &["/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Artifact));
    assert_eq!(result.steps.len(), 5);
    assert!(result.steps[..4].iter().all(|s| s.status == StepStatus::Passed));
    assert_eq!(result.steps[4].status, StepStatus::Failed);
    assert!(result.artifacts.is_empty());
    assert!(!out.path().join("homepage/screenshot.png").exists());
}

#[tokio::test]
async fn server_error_fails_fast_at_status() {
    let server = serve(500, page("Internal Server Error", &[])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Assertion));
    // goto + expect_status only: title and logo are never evaluated
    assert_eq!(result.steps.len(), 2);
    let failed = &result.steps[1];
    assert_eq!(failed.status, StepStatus::Failed);
    assert_eq!(failed.expected.as_deref(), Some("200"));
    assert_eq!(failed.actual.as_deref(), Some("500"));
}

#[tokio::test]
async fn trailing_whitespace_in_title_is_tolerated() {
    let server = serve(200, page("Gitea: Git with a cup of tea ", &["/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&page_checks()).await.unwrap();
    assert!(result.success, "unexpected failure: {:?}", result.error);
}

#[tokio::test]
async fn trailing_text_in_title_fails() {
    let server = serve(200, page("Gitea: Git with a cup of tea - Explore", &["/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 3);
    assert_eq!(result.failure_kind, Some(FailureKind::Assertion));
    assert_eq!(
        result.steps[2].actual.as_deref(),
        Some("\"Gitea: Git with a cup of tea - Explore\"")
    );
}

#[tokio::test]
async fn wrong_logo_extension_is_reported_verbatim() {
    let server = serve(200, page(TITLE, &["/assets/img/logo.png"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 4);
    let failed = &result.steps[3];
    assert_eq!(failed.failure_kind, Some(FailureKind::Assertion));
    assert_eq!(failed.expected.as_deref(), Some("/assets/img/logo.svg"));
    assert_eq!(failed.actual.as_deref(), Some("/assets/img/logo.png"));
}

#[tokio::test]
async fn absolute_logo_url_is_not_accepted() {
    let server = serve(200, page(TITLE, &["http://localhost:3000/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();
    assert!(!result.success);
    assert_eq!(
        result.steps[3].actual.as_deref(),
        Some("http://localhost:3000/assets/img/logo.svg")
    );
}

#[tokio::test]
async fn missing_logo_is_a_locator_failure() {
    let server = serve(200, page(TITLE, &[])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Locator));
    assert!(result.error.unwrap().contains("matched 0 element(s)"));
}

#[tokio::test]
async fn duplicate_logo_is_a_locator_failure() {
    let server = serve(200, page(TITLE, &["/assets/img/logo.svg", "/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&server.uri(), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert_eq!(result.failure_kind, Some(FailureKind::Locator));
    assert!(result.error.unwrap().contains("matched 2 element(s)"));
}

#[tokio::test]
async fn unreachable_instance_is_a_navigation_failure() {
    // bind then drop to get a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let out = TempDir::new().unwrap();
    let runner = TestRunner::new(config(&format!("http://127.0.0.1:{}", port), &out));

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Navigation));
    assert_eq!(result.steps.len(), 1);
}

#[tokio::test]
async fn retries_rerun_failed_attempts() {
    let server = serve(500, page("Internal Server Error", &[])).await;
    let out = TempDir::new().unwrap();
    let mut cfg = config(&server.uri(), &out);
    cfg.retries = 2;
    let runner = TestRunner::new(cfg);

    let result = runner.run_scenario(&homepage::scenario()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.attempts, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn suite_results_are_written_as_json() {
    let server = serve(200, page(TITLE, &["/assets/img/logo.svg"])).await;
    let out = TempDir::new().unwrap();
    let mut runner = TestRunner::new(config(&server.uri(), &out));

    let suite = runner.run_scenarios(&[page_checks()]).await.unwrap();
    assert!(suite.success());

    let path = runner.write_results(&suite).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], 0);
    assert!(json.get("skipped").is_none());
    assert_eq!(json["results"][0]["name"], "homepage");
    assert_eq!(json["results"][0]["steps"].as_array().unwrap().len(), 4);
    assert_eq!(json["results"][0]["steps"][3]["status"], "passed");
}
