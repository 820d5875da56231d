//! Page driver: high-level, screenshot-producing page operations.
//!
//! Every acting operation follows the same shape: acquire the action
//! permit, apply the optional slow-motion delay, dispatch the input or
//! navigation through the CDP session, wait for the page to stabilize,
//! then capture and persist a screenshot whose path is the operation's
//! return value. Read-only operations (`current_url`) skip the permit so
//! they never queue behind a slow action.
//!
//! Coordinates arrive in a logical 1000x1000 space and are scaled to the
//! real viewport here. Out-of-range coordinates are rejected, not
//! clamped: a clamped click lands on whatever happens to sit at the
//! viewport edge, which is worse than an error the caller can react to.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::cdp::{CdpClient, CdpError, MouseButton, PageSession, ScreenshotFormat};
use crate::stabilize::{wait_until_stable, StabilizeBudget};

/// Side length of the logical coordinate space tools address.
pub const LOGICAL_SPACE: f64 = 1000.0;

/// Pause after a focusing click before typing begins.
const FOCUS_SETTLE: Duration = Duration::from_millis(300);

/// Errors surfaced by page driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Coordinates out of range: ({x}, {y}) not in [0..{LOGICAL_SPACE}]x[0..{LOGICAL_SPACE}]")]
    OutOfRange { x: f64, y: f64 },

    #[error("Region has no area: {width}x{height}")]
    EmptyRegion { width: f64, height: f64 },

    #[error("Page driver is closed")]
    Closed,

    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),

    #[error("Screenshot decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Driver over a single attached page.
pub struct PageDriver {
    client: Arc<CdpClient>,
    session: PageSession,
    /// Start URL; also the anchor for the `go_back` origin guard.
    origin: Url,
    /// Real viewport in CSS pixels.
    viewport: (u32, u32),
    screenshot_dir: PathBuf,
    typing_delay: Duration,
    /// Artificial delay before each dispatched action, for watching a
    /// headful session at human speed.
    slow_mo: Option<Duration>,
    action_budget: StabilizeBudget,
    /// Serializes acting operations. Tokio mutex because the critical
    /// section spans awaits.
    permit: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl PageDriver {
    pub fn new(
        client: Arc<CdpClient>,
        session: PageSession,
        origin: Url,
        viewport: (u32, u32),
        screenshot_dir: PathBuf,
        typing_delay: Duration,
        slow_mo: Option<Duration>,
    ) -> Self {
        Self {
            client,
            session,
            origin,
            viewport,
            screenshot_dir,
            typing_delay,
            slow_mo,
            action_budget: StabilizeBudget::default(),
            permit: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// The start URL this driver is anchored to.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Load an absolute URL and wait out the larger initial-load budget.
    /// Used at session creation and when leaving the origin must be
    /// undone; mid-conversation movement goes through clicks instead.
    pub async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        let _permit = self.permit.lock().await;
        self.session.navigate(url).await?;
        wait_until_stable(&self.session, StabilizeBudget::initial()).await;
        info!("Navigated to {}", url);
        Ok(())
    }

    /// Navigate to the start URL. Used on session creation and reset.
    pub async fn goto_origin(&self) -> Result<(), DriverError> {
        let origin = self.origin.clone();
        self.navigate(origin.as_str()).await
    }

    /// Click at logical coordinates and screenshot the result.
    pub async fn click(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u8,
    ) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        let (px, py) = self.to_viewport(x, y)?;
        let _permit = self.permit.lock().await;
        self.pace().await;
        self.session.click(px, py, button, click_count).await?;
        self.settle_and_shoot().await
    }

    /// Type text into the page, optionally focusing a point first, and
    /// screenshot the result.
    pub async fn type_text(
        &self,
        text: &str,
        at: Option<(f64, f64)>,
        clear_before: bool,
        press_enter: bool,
    ) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        let focus = at.map(|(x, y)| self.to_viewport(x, y)).transpose()?;
        let _permit = self.permit.lock().await;
        self.pace().await;

        if let Some((px, py)) = focus {
            self.session.click(px, py, MouseButton::Left, 1).await?;
            tokio::time::sleep(FOCUS_SETTLE).await;
        }

        if clear_before {
            // Select-all + delete; harmless on non-editable targets.
            if let Err(e) = self.clear_field().await {
                warn!("Clearing field before typing failed: {}", e);
            }
        }

        if !text.is_empty() {
            self.session.type_text(text, self.typing_delay).await?;
        }

        if press_enter {
            self.session.press_key("Enter").await?;
        }

        self.settle_and_shoot().await
    }

    /// Scroll by wheel deltas (positive `delta_y` scrolls down) and
    /// screenshot the result. The wheel event is dispatched at the
    /// viewport center.
    pub async fn scroll(&self, delta_x: f64, delta_y: f64) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        let (cx, cy) = (
            f64::from(self.viewport.0) / 2.0,
            f64::from(self.viewport.1) / 2.0,
        );
        let _permit = self.permit.lock().await;
        self.pace().await;
        self.session.wheel(cx, cy, delta_x, delta_y).await?;
        self.settle_and_shoot().await
    }

    /// Sleep for `ms` milliseconds and screenshot whatever the page looks
    /// like afterwards.
    pub async fn wait(&self, ms: u64) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        let _permit = self.permit.lock().await;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        self.settle_and_shoot().await
    }

    /// Navigate one step back in history. If that lands outside the
    /// origin host (an external ad or payment page), force-navigate back
    /// to the start URL instead of leaving the agent stranded.
    pub async fn go_back(&self) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        let _permit = self.permit.lock().await;
        self.pace().await;
        self.session.history_back().await?;
        wait_until_stable(&self.session, self.action_budget).await;

        let here = self.session.current_url().await?;
        if !same_origin(&self.origin, &here) {
            debug!("Back landed off-origin at {}, returning to start URL", here);
            self.session.navigate(self.origin.as_str()).await?;
            wait_until_stable(&self.session, StabilizeBudget::initial()).await;
        }
        self.settle_and_shoot().await
    }

    /// Current page URL. Read-only; bypasses the action permit.
    pub async fn current_url(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self.session.current_url().await?)
    }

    /// Magnify a logical-space region so it fills the viewport, capture
    /// it, then revert. The transform is CSS-only; page state is
    /// untouched.
    pub async fn zoom_region(
        &self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        if width <= 0.0 || height <= 0.0 {
            return Err(DriverError::EmptyRegion { width, height });
        }
        let (px, py) = self.to_viewport(x, y)?;
        let pw = scale_length(width, self.viewport.0);
        let ph = scale_length(height, self.viewport.1);
        let scale = zoom_scale(self.viewport, pw, ph);

        let _permit = self.permit.lock().await;
        self.pace().await;
        self.session
            .evaluate(&format!(
                "(() => {{ const b = document.body.style; \
                 b.transformOrigin = '0 0'; \
                 b.transform = 'translate({:.2}px, {:.2}px) scale({:.4})'; }})()",
                -px, -py, scale
            ))
            .await?;

        wait_until_stable(&self.session, self.action_budget).await;
        let shot = self.capture(None, false).await;

        // Always try to revert, even if the capture failed.
        if let Err(e) = self
            .session
            .evaluate("document.body.style.transform = 'none'")
            .await
        {
            warn!("Reverting zoom transform failed: {}", e);
        }
        shot
    }

    /// Capture a screenshot after stabilization. With `to` unset the file
    /// lands in the screenshot directory under a timestamped name; an
    /// explicit path has its extension coerced to `.png`. `full_page`
    /// captures the whole scrollable page instead of the viewport.
    pub async fn screenshot(
        &self,
        to: Option<PathBuf>,
        full_page: bool,
    ) -> Result<PathBuf, DriverError> {
        self.ensure_open()?;
        let _permit = self.permit.lock().await;
        wait_until_stable(&self.session, self.action_budget).await;
        self.capture(to, full_page).await
    }

    /// Close the page target. Idempotent and best-effort: a page that
    /// already died still counts as closed.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _permit = self.permit.lock().await;
        if let Err(e) = self.client.close_page(self.session.target_id()).await {
            warn!("Closing page target failed: {}", e);
        }
        info!("Page driver closed");
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }
        Ok(())
    }

    /// Map logical coordinates to viewport pixels, rejecting points
    /// outside the logical space.
    fn to_viewport(&self, x: f64, y: f64) -> Result<(f64, f64), DriverError> {
        scale_point(x, y, self.viewport).ok_or(DriverError::OutOfRange { x, y })
    }

    async fn pace(&self) {
        if let Some(delay) = self.slow_mo {
            tokio::time::sleep(delay).await;
        }
    }

    async fn clear_field(&self) -> Result<(), CdpError> {
        self.session.press_key_combo("Control+a").await?;
        self.session.press_key("Delete").await
    }

    /// Stabilize under the per-action budget, then screenshot.
    async fn settle_and_shoot(&self) -> Result<PathBuf, DriverError> {
        wait_until_stable(&self.session, self.action_budget).await;
        self.capture(None, false).await
    }

    async fn capture(&self, to: Option<PathBuf>, full_page: bool) -> Result<PathBuf, DriverError> {
        let path = match to {
            Some(p) => ensure_image_ext(p),
            None => self.screenshot_dir.join(timestamped_name()),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = self
            .session
            .capture_screenshot(format_for(&path), full_page)
            .await?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Screenshot saved to {}", path.display());
        Ok(path)
    }
}

// ============================================================================
// Pure helpers
// ============================================================================

/// Map a logical-space point to viewport pixels. `None` when the point
/// falls outside the logical space.
fn scale_point(x: f64, y: f64, viewport: (u32, u32)) -> Option<(f64, f64)> {
    if !(0.0..=LOGICAL_SPACE).contains(&x) || !(0.0..=LOGICAL_SPACE).contains(&y) {
        return None;
    }
    Some((
        x / LOGICAL_SPACE * f64::from(viewport.0),
        y / LOGICAL_SPACE * f64::from(viewport.1),
    ))
}

/// Map a logical-space length along one axis to viewport pixels.
fn scale_length(len: f64, dim: u32) -> f64 {
    len / LOGICAL_SPACE * f64::from(dim)
}

/// Uniform scale factor that fits a region of the given pixel size into
/// the viewport without distorting its aspect ratio.
fn zoom_scale(viewport: (u32, u32), width: f64, height: f64) -> f64 {
    let sx = f64::from(viewport.0) / width;
    let sy = f64::from(viewport.1) / height;
    sx.min(sy)
}

/// True when `current` sits on the same host as the origin URL. Parse
/// failures count as off-origin.
fn same_origin(origin: &Url, current: &str) -> bool {
    match Url::parse(current) {
        Ok(u) => u.host_str().is_some() && u.host_str() == origin.host_str(),
        Err(_) => false,
    }
}

fn timestamped_name() -> String {
    format!("shot-{}.png", Local::now().format("%Y%m%d-%H%M%S"))
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Keep recognized image extensions on screenshot paths; anything else
/// gets `.png` appended in its place.
fn ensure_image_ext(path: PathBuf) -> PathBuf {
    let recognized = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
    if recognized {
        path
    } else {
        path.with_extension("png")
    }
}

/// Capture format matching the path's extension.
fn format_for(path: &Path) -> ScreenshotFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg") => {
            ScreenshotFormat::Jpeg
        }
        Some(e) if e.eq_ignore_ascii_case("webp") => ScreenshotFormat::Webp,
        _ => ScreenshotFormat::Png,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: (u32, u32) = (1366, 900);

    #[test]
    fn test_scale_point_maps_corners() {
        assert_eq!(scale_point(0.0, 0.0, VIEWPORT), Some((0.0, 0.0)));
        assert_eq!(
            scale_point(1000.0, 1000.0, VIEWPORT),
            Some((1366.0, 900.0))
        );
        let (px, py) = scale_point(500.0, 500.0, VIEWPORT).unwrap();
        assert!((px - 683.0).abs() < 1e-9);
        assert!((py - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_point_rejects_out_of_range() {
        assert!(scale_point(-1.0, 500.0, VIEWPORT).is_none());
        assert!(scale_point(500.0, 1000.1, VIEWPORT).is_none());
        assert!(scale_point(f64::NAN, 500.0, VIEWPORT).is_none());
    }

    #[test]
    fn test_zoom_scale_fits_smaller_axis() {
        // Wide region: horizontal fit dominates.
        assert!((zoom_scale(VIEWPORT, 683.0, 100.0) - 2.0).abs() < 1e-9);
        // Tall region: vertical fit dominates.
        assert!((zoom_scale(VIEWPORT, 100.0, 450.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_origin_compares_hosts() {
        let origin = Url::parse("https://www.wildberries.ru/").unwrap();
        assert!(same_origin(
            &origin,
            "https://www.wildberries.ru/catalog/123"
        ));
        assert!(!same_origin(&origin, "https://pay.example.com/checkout"));
        assert!(!same_origin(&origin, "not a url"));
        assert!(!same_origin(&origin, "about:blank"));
    }

    #[test]
    fn test_ensure_image_ext_keeps_recognized_extensions() {
        for p in ["/tmp/shot.png", "/tmp/shot.jpg", "/tmp/shot.jpeg", "/tmp/shot.webp"] {
            assert_eq!(ensure_image_ext(PathBuf::from(p)), PathBuf::from(p));
        }
        // Case-insensitive, preserved as given.
        assert_eq!(
            ensure_image_ext(PathBuf::from("/tmp/shot.PNG")),
            PathBuf::from("/tmp/shot.PNG")
        );
    }

    #[test]
    fn test_ensure_image_ext_defaults_to_png() {
        assert_eq!(
            ensure_image_ext(PathBuf::from("/tmp/shot")),
            PathBuf::from("/tmp/shot.png")
        );
        assert_eq!(
            ensure_image_ext(PathBuf::from("/tmp/shot.txt")),
            PathBuf::from("/tmp/shot.png")
        );
    }

    #[test]
    fn test_format_matches_extension() {
        assert!(matches!(
            format_for(Path::new("/tmp/shot.jpg")),
            ScreenshotFormat::Jpeg
        ));
        assert!(matches!(
            format_for(Path::new("/tmp/shot.JPEG")),
            ScreenshotFormat::Jpeg
        ));
        assert!(matches!(
            format_for(Path::new("/tmp/shot.webp")),
            ScreenshotFormat::Webp
        ));
        assert!(matches!(
            format_for(Path::new("/tmp/shot.png")),
            ScreenshotFormat::Png
        ));
    }

    #[test]
    fn test_timestamped_name_shape() {
        let name = timestamped_name();
        assert!(name.starts_with("shot-"));
        assert!(name.ends_with(".png"));
        // shot-YYYYMMDD-HHMMSS.png
        assert_eq!(name.len(), "shot-20260101-120000.png".len());
    }
}
