//! Playwright browser automation
//!
//! The browser is driven by a small Node program speaking newline-delimited
//! JSON over stdin/stdout. Each command carries an `id`; the driver answers
//! every command with exactly one reply line carrying the same `id`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::config::TimeoutConfig;
use crate::context::{resolve_url, BrowsingContext, ElementQuery, PageResponse};
use crate::error::{E2eError, E2eResult};

/// Environment variable carrying the launch options to the driver
const DRIVER_OPTIONS_ENV: &str = "GITEA_E2E_DRIVER_OPTIONS";

/// Extra time granted to the driver on top of the operation's own budget
const REPLY_GRACE: Duration = Duration::from_secs(5);

/// Time allowed for the browser to launch
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

const DRIVER_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const options = JSON.parse(process.env.GITEA_E2E_DRIVER_OPTIONS || '{}');
const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const selectorSyntax = /while parsing (css )?selector|is not a valid selector|unknown engine|unexpected token/i;

(async () => {
  const browser = await playwright[options.browser || 'chromium'].launch({ headless: options.headless !== false });
  const context = await browser.newContext({
    viewport: { width: options.width || 1280, height: options.height || 720 },
    locale: 'en-US',
  });
  const page = await context.newPage();
  reply({ id: 0, ok: true, result: { ready: true } });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const cmd = JSON.parse(line);
    try {
      let result;
      switch (cmd.op) {
        case 'goto': {
          const resp = await page.goto(cmd.url, { timeout: cmd.timeout_ms });
          result = { status: resp ? resp.status() : null, url: page.url() };
          break;
        }
        case 'title':
          result = { title: await page.title() };
          break;
        case 'query': {
          const loc = page.locator(cmd.selector);
          const count = await loc.count();
          const values = cmd.attribute
            ? await loc.evaluateAll((els, name) => els.map((el) => el.getAttribute(name)), cmd.attribute)
            : [];
          result = { count, values };
          break;
        }
        case 'screenshot':
          await page.screenshot({ path: cmd.path, fullPage: cmd.full_page, timeout: cmd.timeout_ms });
          result = { path: cmd.path };
          break;
        case 'close':
          await browser.close();
          reply({ id: cmd.id, ok: true, result: {} });
          return;
        default:
          throw new Error('unknown op: ' + cmd.op);
      }
      reply({ id: cmd.id, ok: true, result });
    } catch (error) {
      let kind = 'error';
      if (error.name === 'TimeoutError') kind = 'timeout';
      else if (cmd.op === 'query' && selectorSyntax.test(error.message)) kind = 'selector';
      reply({ id: cmd.id, ok: false, error: { kind, message: error.message } });
    }
  }
  await browser.close();
})().catch((error) => {
  process.stderr.write(JSON.stringify({ fatal: error.message }) + '\n');
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Node project directory with `playwright` in node_modules
    pub project_dir: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Node executable
    pub node: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node: PathBuf::from("node"),
        }
    }
}

/// Launch options handed to the driver through the environment
#[derive(Debug, Serialize)]
struct DriverOptions<'a> {
    browser: &'a str,
    headless: bool,
    width: u32,
    height: u32,
}

/// A command sent to the driver
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand {
    Goto { url: String, timeout_ms: u64 },
    Title,
    Query { selector: String, attribute: Option<String> },
    Screenshot { path: String, full_page: bool, timeout_ms: u64 },
    Close,
}

impl DriverCommand {
    fn name(&self) -> &'static str {
        match self {
            DriverCommand::Goto { .. } => "goto",
            DriverCommand::Title => "title",
            DriverCommand::Query { .. } => "query",
            DriverCommand::Screenshot { .. } => "screenshot",
            DriverCommand::Close => "close",
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a DriverCommand,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<DriverFailure>,
}

#[derive(Debug, Clone, Deserialize)]
struct DriverFailure {
    kind: String,
    message: String,
}

impl DriverFailure {
    fn is_timeout(&self) -> bool {
        self.kind == "timeout"
    }

    fn is_selector(&self) -> bool {
        self.kind == "selector"
    }

    /// Map a failed page read; only syntax errors are the selector's fault
    fn into_error(self, operation: &str, selector: Option<&str>) -> E2eError {
        match selector {
            Some(selector) if self.is_selector() => E2eError::InvalidSelector {
                selector: selector.to_string(),
                reason: self.message,
            },
            _ if self.is_timeout() => E2eError::Timeout(format!("page {}: {}", operation, self.message)),
            _ => E2eError::PageUnavailable {
                operation: operation.to_string(),
                reason: self.message,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GotoResult {
    status: Option<u16>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct TitleResult {
    title: String,
}

/// Handle to a running driver process
pub struct PlaywrightHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl PlaywrightHandle {
    /// Check if Playwright is installed in the project directory
    pub async fn check_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Spawn the driver and wait until the browser is up
    pub async fn spawn(config: &PlaywrightConfig) -> E2eResult<Self> {
        Self::check_installed(config).await?;

        let options = serde_json::to_string(&DriverOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            width: config.viewport_width,
            height: config.viewport_height,
        })?;

        info!("Launching {} via Playwright", config.browser.as_str());

        let mut child = Command::new(&config.node)
            .arg("-e")
            .arg(DRIVER_SCRIPT)
            .current_dir(&config.project_dir)
            .env(DRIVER_OPTIONS_ENV, options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn {}: {}", config.node.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".to_string()))?;

        let mut handle = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        };

        let ready = handle.read_reply(0, LAUNCH_TIMEOUT, "launch").await?;
        if !ready.ok {
            let message = ready.error.map(|e| e.message).unwrap_or_default();
            return Err(E2eError::Playwright(format!("browser launch failed: {}", message)));
        }

        debug!("Playwright driver ready (pid: {:?})", handle.child.id());
        Ok(handle)
    }

    /// Send a command and wait for its reply
    async fn send(&mut self, command: &DriverCommand, budget: Duration) -> E2eResult<DriverReply> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Envelope { id, command })?;
        line.push('\n');
        debug!("-> driver {}", line.trim_end());

        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        self.read_reply(id, budget + REPLY_GRACE, command.name()).await
    }

    async fn read_reply(&mut self, id: u64, wait: Duration, what: &str) -> E2eResult<DriverReply> {
        tokio::time::timeout(wait, self.next_reply(id, what))
            .await
            .map_err(|_| E2eError::Timeout(format!("Playwright driver reply to '{}'", what)))?
    }

    async fn next_reply(&mut self, id: u64, what: &str) -> E2eResult<DriverReply> {
        loop {
            let line = self.stdout.next_line().await?.ok_or_else(|| {
                E2eError::Playwright(format!("driver exited while waiting for '{}'", what))
            })?;
            match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) if reply.id == id => return Ok(reply),
                Ok(reply) => warn!("Ignoring stale driver reply {}", reply.id),
                // page scripts may write to stdout; only JSON replies matter
                Err(_) => debug!("driver: {}", line),
            }
        }
    }

    /// Ask the driver to close the browser, then reap the process
    pub async fn close(&mut self) -> E2eResult<()> {
        if let Err(e) = self.send(&DriverCommand::Close, Duration::from_secs(5)).await {
            warn!("Driver did not close cleanly: {}", e);
        }
        let _ = self.child.kill().await;
        Ok(())
    }
}

/// `BrowsingContext` backed by a Playwright page
pub struct PlaywrightContext {
    handle: PlaywrightHandle,
    base_url: Url,
    navigation_timeout: Duration,
    action_timeout: Duration,
}

impl PlaywrightContext {
    /// Launch a browser with a single fresh page
    pub async fn launch(base_url: Url, config: PlaywrightConfig, timeouts: &TimeoutConfig) -> E2eResult<Self> {
        let handle = PlaywrightHandle::spawn(&config).await?;
        Ok(Self {
            handle,
            base_url,
            navigation_timeout: timeouts.navigation(),
            action_timeout: timeouts.expect(),
        })
    }

    fn failure(reply: &DriverReply) -> DriverFailure {
        reply.error.clone().unwrap_or(DriverFailure {
            kind: "error".to_string(),
            message: "driver reported failure without details".to_string(),
        })
    }
}

#[async_trait]
impl BrowsingContext for PlaywrightContext {
    async fn goto(&mut self, path: &str) -> E2eResult<Option<PageResponse>> {
        let url = resolve_url(&self.base_url, path)?;
        let command = DriverCommand::Goto {
            url: url.to_string(),
            timeout_ms: self.navigation_timeout.as_millis() as u64,
        };

        let reply = self.handle.send(&command, self.navigation_timeout).await?;
        if !reply.ok {
            let failure = Self::failure(&reply);
            let reason = if failure.is_timeout() {
                format!("timed out after {} ms: {}", self.navigation_timeout.as_millis(), failure.message)
            } else {
                failure.message
            };
            return Err(E2eError::Navigation { url: url.to_string(), reason });
        }

        let result: GotoResult = serde_json::from_value(reply.result)?;
        Ok(result.status.map(|status| PageResponse { url: result.url, status }))
    }

    async fn title(&mut self) -> E2eResult<String> {
        let reply = self.handle.send(&DriverCommand::Title, self.action_timeout).await?;
        if !reply.ok {
            return Err(Self::failure(&reply).into_error("title", None));
        }
        let result: TitleResult = serde_json::from_value(reply.result)?;
        Ok(result.title)
    }

    async fn query(&mut self, selector: &str, attribute: Option<&str>) -> E2eResult<ElementQuery> {
        let command = DriverCommand::Query {
            selector: selector.to_string(),
            attribute: attribute.map(String::from),
        };
        let reply = self.handle.send(&command, self.action_timeout).await?;
        if !reply.ok {
            return Err(Self::failure(&reply).into_error("query", Some(selector)));
        }
        Ok(serde_json::from_value(reply.result)?)
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> E2eResult<()> {
        let command = DriverCommand::Screenshot {
            path: path.to_string_lossy().to_string(),
            full_page,
            timeout_ms: self.navigation_timeout.as_millis() as u64,
        };
        let reply = self.handle.send(&command, self.navigation_timeout).await?;
        if !reply.ok {
            return Err(E2eError::ArtifactWrite {
                path: path.to_path_buf(),
                reason: Self::failure(&reply).message,
            });
        }
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.handle.close().await
    }

    fn backend(&self) -> &'static str {
        "playwright"
    }
}
