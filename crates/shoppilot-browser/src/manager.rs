//! Session lifecycle: launching Chrome, owning the single live page driver.
//!
//! The manager holds at most one session at a time. A browser engine is
//! the most expensive resource in the process, so conversations share one
//! warm page instead of each paying a cold start: `reset` re-navigates to
//! the start URL between conversations, `close` tears everything down.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::cdp::{CdpClient, CdpError};
use crate::driver::{DriverError, PageDriver};

/// Session manager errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Chrome not found. Please install Google Chrome or Chromium.")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Invalid start URL '{url}': {source}")]
    InvalidStartUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("No live session")]
    NoSession,

    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Session configuration. Applied by the first `get_or_create` call; later
/// calls against a live session ignore their config.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub start_url: String,
    /// Viewport in CSS pixels (width, height).
    pub viewport: (u32, u32),
    pub user_agent: Option<String>,
    pub screenshot_dir: PathBuf,
    /// Per-keystroke delay when typing.
    pub typing_delay_ms: u64,
    /// Artificial pre-action delay for watching a headful run; 0 disables.
    pub slow_mo_ms: u64,
    /// Chrome remote debugging port.
    pub debug_port: u16,
    /// Profile directory for persistent cookies/login state.
    pub profile_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            start_url: "https://www.wildberries.ru/".to_string(),
            viewport: (1366, 900),
            user_agent: None,
            screenshot_dir: PathBuf::from("screenshots"),
            typing_delay_ms: 10,
            slow_mo_ms: 0,
            debug_port: 9222,
            profile_dir: None,
        }
    }
}

impl SessionConfig {
    fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.debug_port)
    }

    fn resolve_profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".shoppilot")
                .join("browser-profile")
        })
    }
}

/// What the manager holds while a session is live.
struct LiveSession {
    driver: Arc<PageDriver>,
    client: Arc<CdpClient>,
    /// Chrome process handle, present only when we launched it ourselves.
    chrome: Option<Child>,
}

/// Singleton session manager.
pub struct SessionManager {
    live: Mutex<Option<LiveSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            live: Mutex::new(None),
        }
    }

    /// Return the live page driver, creating the whole stack (Chrome,
    /// CDP connection, page, initial navigation) if none exists.
    /// Idempotent: a second call returns the existing driver and its
    /// config argument is ignored.
    pub async fn get_or_create(
        &self,
        config: SessionConfig,
    ) -> Result<Arc<PageDriver>, SessionError> {
        let mut live = self.live.lock().await;
        if let Some(session) = live.as_ref() {
            debug!("Session already live, ignoring config");
            return Ok(session.driver.clone());
        }

        let origin =
            Url::parse(&config.start_url).map_err(|source| SessionError::InvalidStartUrl {
                url: config.start_url.clone(),
                source,
            })?;

        let chrome = self.ensure_chrome(&config).await?;
        let client = Arc::new(CdpClient::connect(&config.endpoint()).await?);

        let page = client.new_page(None).await?;
        page.set_viewport(config.viewport.0, config.viewport.1).await?;
        if let Some(ua) = &config.user_agent {
            page.set_user_agent(ua).await?;
        }

        let driver = Arc::new(PageDriver::new(
            client.clone(),
            page,
            origin,
            config.viewport,
            config.screenshot_dir.clone(),
            Duration::from_millis(config.typing_delay_ms),
            (config.slow_mo_ms > 0).then(|| Duration::from_millis(config.slow_mo_ms)),
        ));
        driver.goto_origin().await?;

        info!("Session created at {}", config.start_url);
        *live = Some(LiveSession {
            driver: driver.clone(),
            client,
            chrome,
        });
        Ok(driver)
    }

    /// The live driver, if any.
    pub async fn current(&self) -> Option<Arc<PageDriver>> {
        self.live.lock().await.as_ref().map(|s| s.driver.clone())
    }

    /// Re-navigate the warm page to the start URL. Errors when no session
    /// is live; callers wanting create-or-reset semantics call
    /// `get_or_create` first.
    pub async fn reset(&self) -> Result<Arc<PageDriver>, SessionError> {
        let driver = {
            let live = self.live.lock().await;
            live.as_ref()
                .map(|s| s.driver.clone())
                .ok_or(SessionError::NoSession)?
        };
        driver.goto_origin().await?;
        info!("Session reset to origin");
        Ok(driver)
    }

    /// Tear the session down: close the page, drop the CDP connection,
    /// kill Chrome if we launched it. Idempotent; a call with no live
    /// session is a no-op.
    pub async fn close(&self) {
        let Some(session) = self.live.lock().await.take() else {
            debug!("Close with no live session, nothing to do");
            return;
        };

        session.driver.close().await;
        drop(session.client);
        if let Some(mut chrome) = session.chrome {
            info!("Shutting down Chrome");
            if let Err(e) = chrome.kill().await {
                warn!("Killing Chrome failed: {}", e);
            }
        }
        info!("Session closed");
    }

    /// Connect to an already-running Chrome or launch one, returning the
    /// child handle when we own the process.
    async fn ensure_chrome(&self, config: &SessionConfig) -> Result<Option<Child>, SessionError> {
        if is_chrome_running(&config.endpoint()).await {
            info!("Chrome already running on port {}", config.debug_port);
            return Ok(None);
        }

        info!("Chrome not running on port {}, launching...", config.debug_port);
        let child = launch_chrome(config)?;

        // Chrome needs a moment before the debugging endpoint answers.
        let mut attempts = 0;
        let max_attempts = 30;
        while attempts < max_attempts {
            tokio::time::sleep(Duration::from_millis(200)).await;
            if is_chrome_running(&config.endpoint()).await {
                return Ok(Some(child));
            }
            attempts += 1;
        }

        Err(SessionError::LaunchFailed(
            "Chrome failed to start within timeout".to_string(),
        ))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Find a Chrome executable on this machine.
pub fn find_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let paths = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];
        for path in &paths {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let paths = [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];
        for path in &paths {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let paths = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];
        for path in &paths {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

async fn is_chrome_running(endpoint: &str) -> bool {
    reqwest::get(format!("{}/json/version", endpoint)).await.is_ok()
}

fn launch_chrome(config: &SessionConfig) -> Result<Child, SessionError> {
    let chrome_path = find_chrome().ok_or(SessionError::ChromeNotFound)?;
    let profile_dir = config.resolve_profile_dir();

    if let Err(e) = std::fs::create_dir_all(&profile_dir) {
        warn!("Failed to create profile directory: {}", e);
    }

    info!("Launching Chrome with profile at: {}", profile_dir.display());

    let mut cmd = Command::new(&chrome_path);
    cmd.arg(format!("--remote-debugging-port={}", config.debug_port))
        .arg(format!("--user-data-dir={}", profile_dir.display()))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-background-networking")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-extensions")
        .arg("--disable-notifications")
        .arg("--disable-sync")
        .arg("--metrics-recording-only")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if config.headless {
        cmd.arg("--headless=new");
    }

    let child = cmd
        .spawn()
        .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

    info!("Chrome launched with PID: {:?}", child.id());
    Ok(child)
}
