//! Bringing up a real browser: geckodriver on a random port (or an
//! endpoint from `WEBDRIVER_URL`) and a Firefox session, headless unless
//! configured otherwise.

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::page::{Page, WebDriverPage};
use crate::session::{Launcher, Session, SessionProvider};

/// Spread of the random port picked above the configured base.
const PORT_SPREAD: u16 = 100;

/// Launches Firefox sessions. Without a configured endpoint every launch
/// gets its own geckodriver, since one geckodriver serves one session.
pub struct WebDriverLauncher {
    config: Arc<HarnessConfig>,
    drivers: Mutex<Vec<Child>>,
}

impl WebDriverLauncher {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        WebDriverLauncher {
            config,
            drivers: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Launcher for WebDriverLauncher {
    async fn launch(&self) -> HarnessResult<Box<dyn Page>> {
        let endpoint = match &self.config.webdriver_url {
            Some(url) => url.clone(),
            None => {
                let (child, port) = start_geckodriver_with_retry(
                    self.config.geckodriver_port,
                    self.config.geckodriver_attempts,
                )
                .await?;
                self.drivers
                    .lock()
                    .map_err(|_| HarnessError::UnexpectedState("driver list poisoned".into()))?
                    .push(child);
                format!("http://localhost:{port}")
            }
        };
        let client = connect_to_browser(&endpoint, &self.config).await?;
        info!("✅ Browser connected via {endpoint}");
        Ok(Box::new(WebDriverPage::new(client)))
    }
}

impl Drop for WebDriverLauncher {
    fn drop(&mut self) {
        let Ok(drivers) = self.drivers.get_mut() else {
            return;
        };
        for driver in drivers.iter_mut() {
            if let Err(e) = driver.kill() {
                warn!("Failed to kill geckodriver process: {}", e);
            }
        }
    }
}

async fn start_geckodriver_with_retry(
    base_port: u16,
    attempts: u32,
) -> HarnessResult<(Child, u16)> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let port = base_port.saturating_add(rand::thread_rng().gen_range(0..=PORT_SPREAD));
        debug!(
            "Attempting to start geckodriver on port {} (attempt {})",
            port, attempt
        );

        match Command::new("geckodriver")
            .arg("--port")
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                // A port conflict makes geckodriver exit right away.
                sleep(Duration::from_millis(500)).await;
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(
                            "Geckodriver exited with status {}, trying different port",
                            status
                        );
                    }
                    Ok(None) => return Ok((child, port)),
                    Err(e) => {
                        debug!("Error checking geckodriver status: {}", e);
                        let _ = child.kill();
                    }
                }
            }
            Err(e) => {
                debug!("Failed to start geckodriver: {}", e);
            }
        }

        if attempt < attempts {
            sleep(Duration::from_millis(100)).await;
        }
    }

    Err(HarnessError::Configuration(format!(
        "Failed to start geckodriver on ports {base_port}..={} after {attempts} attempts",
        base_port.saturating_add(PORT_SPREAD)
    )))
}

async fn connect_to_browser(
    endpoint: &str,
    config: &HarnessConfig,
) -> HarnessResult<fantoccini::Client> {
    let download_dir = std::path::absolute(&config.download_dir)?;
    let mut firefox_opts = serde_json::json!({
        "log": {"level": "error"},
        "prefs": {
            "browser.download.folderList": 2,
            "browser.download.dir": download_dir.to_string_lossy(),
            "browser.download.useDownloadDir": true,
            "browser.helperApps.neverAsk.saveToDisk":
                "application/pdf,text/csv,application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
    });
    if config.headless {
        info!("👻 Starting browser in headless mode");
        firefox_opts["args"] = serde_json::json!(["--headless"]);
    } else {
        info!("🖥️ Starting browser in headed mode");
    }

    let mut caps = serde_json::Map::new();
    caps.insert("moz:firefoxOptions".to_string(), firefox_opts);
    Ok(ClientBuilder::native()
        .capabilities(caps)
        .connect(endpoint)
        .await?)
}

/// Everything a live scenario needs: configuration from the environment and
/// a session provider backed by real browsers.
pub struct TestEnvironment {
    pub config: Arc<HarnessConfig>,
    pub sessions: SessionProvider,
}

impl TestEnvironment {
    pub fn setup() -> Result<Self> {
        let config = HarnessConfig::from_env().context("Failed to read harness configuration")?;
        Ok(Self::with_config(config))
    }

    /// Same as [`TestEnvironment::setup`] but with a visible browser window.
    pub fn setup_headed() -> Result<Self> {
        let mut config =
            HarnessConfig::from_env().context("Failed to read harness configuration")?;
        config.headless = false;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: HarnessConfig) -> Self {
        let config = Arc::new(config);
        let launcher = WebDriverLauncher::new(Arc::clone(&config));
        TestEnvironment {
            sessions: SessionProvider::new(Arc::clone(&config), Box::new(launcher)),
            config,
        }
    }

    /// Fail early with a readable error when nothing answers at
    /// `BASE_URL`, instead of timing out on the login page.
    pub async fn ensure_app_reachable(&self) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeouts.navigation)
            .build()?;
        let url = self.config.url(&self.config.login_path)?;
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Application not reachable at {url}"))?;
        debug!("{url} answered {}", response.status());
        if response.status().is_server_error() {
            anyhow::bail!("Application at {url} answered {}", response.status());
        }
        Ok(())
    }

    pub async fn login(&self, role: &str) -> Result<Session> {
        self.sessions
            .login(role)
            .await
            .with_context(|| format!("Failed to log in as {role}"))
    }
}
