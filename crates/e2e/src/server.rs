//! Server management - spawning the instance under test and waiting for it

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::context::resolve_url;
use crate::error::{E2eError, E2eResult};

/// Health endpoint served by Gitea
pub const HEALTH_PATH: &str = "/api/healthz";

/// Handle to a running server process
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn `<binary> web --port <port>` and wait until it is healthy
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", config.binary_path.display(), port);

        let mut cmd = Command::new(&config.binary_path);
        cmd.arg("web").arg("--port").arg(port.to_string());
        if let Some(app_ini) = &config.app_ini {
            cmd.arg("--config").arg(app_ini);
        }
        if let Some(work_dir) = &config.work_dir {
            cmd.current_dir(work_dir).env("GITEA_WORK_DIR", work_dir);
        }
        cmd.envs(&config.env);

        cmd.stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!(
                "Failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        wait_until_reachable(&base_url, config.startup_timeout()).await?;

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// The health endpoint, resolved the same way page navigations are
pub fn health_url(base_url: &str) -> E2eResult<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| E2eError::Config(format!("invalid base_url '{}': {}", base_url, e)))?;
    resolve_url(&base, HEALTH_PATH)
}

/// Poll the health endpoint of `base_url` until it answers with success
pub async fn wait_until_reachable(base_url: &str, timeout: Duration) -> E2eResult<()> {
    let health_url = health_url(base_url)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout {
        attempts += 1;

        match client.get(health_url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => {
                return Ok(());
            }
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", base_url);
                }
                // refused connections are expected while the server starts
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(E2eError::ServerHealthCheck(attempts))
}

/// Configuration for spawning a server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path to the gitea binary
    pub binary_path: PathBuf,

    /// app.ini passed with --config
    pub app_ini: Option<PathBuf>,

    /// Working directory, also exported as GITEA_WORK_DIR
    pub work_dir: Option<PathBuf>,

    /// Extra environment, e.g. GITEA__security__INSTALL_LOCK
    pub env: HashMap<String, String>,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("./gitea"),
            app_ini: None,
            work_dir: None,
            env: HashMap::new(),
            port: None,
            startup_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
