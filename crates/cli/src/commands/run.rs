//! Run Command

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use gitea_e2e::config::{Backend, HarnessConfig};
use gitea_e2e::playwright::Browser;
use gitea_e2e::server::ServerConfig;
use gitea_e2e::TestRunner;

use crate::output::{print_suite, OutputFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Harness config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scenario file or directory (default: built-in homepage check)
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Base URL of the instance under test
    #[arg(long, env = "GITEA_URL")]
    pub base_url: Option<String>,

    /// Browsing backend (playwright, http)
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Node project directory with playwright installed
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Extra attempts for failed tests
    #[arg(long)]
    pub retries: Option<u32>,

    /// Output directory for screenshots and results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Spawn this gitea binary instead of using a running instance
    #[arg(long)]
    pub server_binary: Option<PathBuf>,
}

impl RunArgs {
    /// Layer the flags over the loaded config
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if let Some(dir) = &self.project_dir {
            config.playwright.project_dir = dir.clone();
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(binary) = &self.server_binary {
            let server = config.server.get_or_insert_with(ServerConfig::default);
            server.binary_path = binary.clone();
        }
    }
}

pub async fn execute(args: RunArgs, format: OutputFormat) -> Result<bool> {
    let mut config = HarnessConfig::load(args.config.as_deref()).context("loading config")?;
    args.apply(&mut config);
    config.validate()?;

    let scenarios = super::select(
        super::load_scenarios(args.scenarios.as_deref())?,
        args.tag.as_deref(),
        args.name.as_deref(),
    );
    if scenarios.is_empty() {
        bail!("no scenarios selected");
    }

    info!(
        "Backend: {}, base URL: {}, retries: {}",
        config.backend.as_str(),
        config.base_url,
        config.retries
    );

    let mut runner = TestRunner::new(config);
    runner.start_server().await?;

    let suite = runner.run_scenarios(&scenarios).await?;
    runner.write_results(&suite)?;

    print_suite(&suite, format);
    Ok(suite.success())
}
