//! Page action tools.
//!
//! Each tool wraps one [`PageDriver`] primitive behind the uniform
//! tool-call interface the orchestrator's LLM loop consumes. Tools never
//! create sessions: callers establish one through the session manager
//! first, and a tool call without a live session fails with a
//! `SessionNotReady` error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use shoppilot_protocols::{ParamKind, ParamSpec, Tool, ToolDefinition, ToolError, ToolOutput, ToolSet};

use crate::cdp::MouseButton;
use crate::driver::{DriverError, PageDriver};
use crate::manager::SessionManager;

/// Register every page action tool against the given manager.
pub fn register_page_tools(set: &mut ToolSet, manager: Arc<SessionManager>) {
    set.register(Arc::new(ClickTool::new(manager.clone())));
    set.register(Arc::new(TypeTextTool::new(manager.clone())));
    set.register(Arc::new(ScrollTool::new(manager.clone())));
    set.register(Arc::new(WaitTool::new(manager.clone())));
    set.register(Arc::new(GoBackTool::new(manager.clone())));
    set.register(Arc::new(GetCurrentUrlTool::new(manager.clone())));
    set.register(Arc::new(ZoomTool::new(manager)));
}

async fn require_driver(manager: &SessionManager) -> Result<Arc<PageDriver>, ToolError> {
    manager
        .current()
        .await
        .ok_or_else(|| ToolError::SessionNotReady("no live browser session".to_string()))
}

fn driver_err(e: DriverError) -> ToolError {
    match e {
        DriverError::OutOfRange { .. } | DriverError::EmptyRegion { .. } => {
            ToolError::InvalidParameters(e.to_string())
        }
        DriverError::Closed => ToolError::SessionNotReady(e.to_string()),
        other => ToolError::ExecutionFailed(other.to_string()),
    }
}

fn invalid(e: serde_json::Error) -> ToolError {
    ToolError::InvalidParameters(e.to_string())
}

// ============================================================================
// Click
// ============================================================================

/// X coordinate, either a scalar or a bundled `[x, y]` pair. Some callers
/// emit the pair form; when present it overrides a separate `y`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoordArg {
    Scalar(f64),
    Pair([f64; 2]),
}

#[derive(Debug, Deserialize)]
struct ClickParams {
    x: CoordArg,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default = "default_button")]
    button: String,
    #[serde(default = "default_click_count")]
    click_count: u8,
}

fn default_button() -> String {
    "left".to_string()
}

fn default_click_count() -> u8 {
    1
}

impl ClickParams {
    fn point(&self) -> Result<(f64, f64), ToolError> {
        match self.x {
            CoordArg::Pair([x, y]) => Ok((x, y)),
            CoordArg::Scalar(x) => {
                let y = self.y.ok_or_else(|| {
                    ToolError::InvalidParameters(
                        "click: missing required parameter 'y'".to_string(),
                    )
                })?;
                Ok((x, y))
            }
        }
    }

    fn button(&self) -> Result<MouseButton, ToolError> {
        MouseButton::parse(&self.button).ok_or_else(|| {
            ToolError::InvalidParameters(format!(
                "click: unknown button '{}', expected left/right/middle",
                self.button
            ))
        })
    }

    fn count(&self) -> Result<u8, ToolError> {
        match self.click_count {
            1 | 2 => Ok(self.click_count),
            n => Err(ToolError::InvalidParameters(format!(
                "click: click_count must be 1 or 2, got {n}"
            ))),
        }
    }
}

/// Click at logical coordinates.
pub struct ClickTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl ClickTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let definition = ToolDefinition::new(
            "click",
            "Clicks at given X,Y coordinates with left/right/middle button and optional \
             double click. Returns a screenshot after the action.",
        )
        .with_param(ParamSpec::required(
            "x",
            ParamKind::Integer,
            "X coordinate from 0 to 1000. Also accepts a two-element [x, y] pair.",
        ))
        .with_param(ParamSpec::required(
            "y",
            ParamKind::Integer,
            "Y coordinate from 0 to 1000.",
        ))
        .with_param(ParamSpec::optional(
            "button",
            ParamKind::String,
            "Mouse button to click: 'left', 'right', or 'middle'.",
            json!("left"),
        ))
        .with_param(ParamSpec::optional(
            "click_count",
            ParamKind::Integer,
            "Number of clicks: 1 for single click, 2 for double click.",
            json!(1),
        ));
        Self { definition, manager }
    }
}

#[async_trait]
impl Tool for ClickTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    // Schema validation would reject the bundled-pair form of `x`, so
    // this tool validates through its params struct instead.
    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        let params: ClickParams = serde_json::from_value(args.clone()).map_err(invalid)?;
        params.point()?;
        params.button()?;
        params.count()?;
        Ok(())
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let params: ClickParams = serde_json::from_value(args).map_err(invalid)?;
        let (x, y) = params.point()?;
        let button = params.button()?;
        let count = params.count()?;

        let driver = require_driver(&self.manager).await?;
        let path = driver
            .click(x, y, button, count)
            .await
            .map_err(driver_err)?;

        debug!("click({}, {}) -> {}", x, y, path.display());
        Ok(ToolOutput::image(path))
    }
}

// ============================================================================
// Type text
// ============================================================================

#[derive(Debug, Deserialize)]
struct TypeTextParams {
    text: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default = "default_true")]
    press_enter: bool,
    #[serde(default = "default_true")]
    clear_before: bool,
}

fn default_true() -> bool {
    true
}

/// Type text into the focused field.
pub struct TypeTextTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl TypeTextTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let definition = ToolDefinition::new(
            "type_text",
            "Types text into the currently focused field (click the field first, or pass \
             x/y to focus one). Optionally clears the input and presses Enter, then \
             returns a screenshot. Use this to fill the search field, for example.",
        )
        .with_param(ParamSpec::required(
            "text",
            ParamKind::String,
            "Text to type into the focused field.",
        ))
        .with_param(ParamSpec::optional(
            "x",
            ParamKind::Integer,
            "Optional X coordinate (0..1000) to click for focus before typing.",
            json!(null),
        ))
        .with_param(ParamSpec::optional(
            "y",
            ParamKind::Integer,
            "Optional Y coordinate (0..1000) to click for focus before typing.",
            json!(null),
        ))
        .with_param(ParamSpec::optional(
            "press_enter",
            ParamKind::Boolean,
            "Press Enter after typing.",
            json!(true),
        ))
        .with_param(ParamSpec::optional(
            "clear_before",
            ParamKind::Boolean,
            "Clear the input field before typing.",
            json!(true),
        ));
        Self { definition, manager }
    }
}

#[async_trait]
impl Tool for TypeTextTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    // The optional focus coordinates default to null, which the schema
    // kinds would reject; params-struct validation handles them.
    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        serde_json::from_value::<TypeTextParams>(args.clone())
            .map(|_| ())
            .map_err(invalid)
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let params: TypeTextParams = serde_json::from_value(args).map_err(invalid)?;
        let at = match (params.x, params.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };

        let driver = require_driver(&self.manager).await?;
        let path = driver
            .type_text(&params.text, at, params.clear_before, params.press_enter)
            .await
            .map_err(driver_err)?;

        debug!("type_text({:?}) -> {}", params.text, path.display());
        Ok(ToolOutput::image(path))
    }
}

// ============================================================================
// Scroll
// ============================================================================

#[derive(Debug, Deserialize)]
struct ScrollParams {
    #[serde(default)]
    delta_x: f64,
    #[serde(default = "default_delta_y")]
    delta_y: f64,
}

fn default_delta_y() -> f64 {
    800.0
}

/// Scroll the page by wheel deltas.
pub struct ScrollTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl ScrollTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let definition = ToolDefinition::new(
            "scroll",
            "Scrolls the page by delta_x and delta_y and returns a screenshot.",
        )
        .with_param(ParamSpec::optional(
            "delta_x",
            ParamKind::Integer,
            "Horizontal scroll delta (positive scrolls right).",
            json!(0),
        ))
        .with_param(ParamSpec::optional(
            "delta_y",
            ParamKind::Integer,
            "Vertical scroll delta (positive scrolls down).",
            json!(800),
        ));
        Self { definition, manager }
    }
}

#[async_trait]
impl Tool for ScrollTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let params: ScrollParams = serde_json::from_value(args).map_err(invalid)?;

        let driver = require_driver(&self.manager).await?;
        let path = driver
            .scroll(params.delta_x, params.delta_y)
            .await
            .map_err(driver_err)?;

        debug!(
            "scroll({}, {}) -> {}",
            params.delta_x,
            params.delta_y,
            path.display()
        );
        Ok(ToolOutput::image(path))
    }
}

// ============================================================================
// Wait
// ============================================================================

#[derive(Debug, Deserialize)]
struct WaitParams {
    #[serde(default = "default_wait_ms")]
    ms: u64,
}

fn default_wait_ms() -> u64 {
    1000
}

/// Wait a fixed delay, then screenshot.
pub struct WaitTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl WaitTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let definition = ToolDefinition::new(
            "wait",
            "Waits for a specified number of milliseconds, then returns a screenshot.",
        )
        .with_param(ParamSpec::optional(
            "ms",
            ParamKind::Integer,
            "Milliseconds to wait.",
            json!(1000),
        ));
        Self { definition, manager }
    }
}

#[async_trait]
impl Tool for WaitTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let params: WaitParams = serde_json::from_value(args).map_err(invalid)?;

        let driver = require_driver(&self.manager).await?;
        let path = driver.wait(params.ms).await.map_err(driver_err)?;

        debug!("wait({}ms) -> {}", params.ms, path.display());
        Ok(ToolOutput::image(path))
    }
}

// ============================================================================
// Go back
// ============================================================================

/// Navigate back in history, guarded against leaving the origin site.
pub struct GoBackTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl GoBackTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "go_back",
                "Goes back to the previous page in browser history and returns a screenshot.",
            ),
            manager,
        }
    }
}

#[async_trait]
impl Tool for GoBackTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, _args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let driver = require_driver(&self.manager).await?;
        let path = driver.go_back().await.map_err(driver_err)?;
        debug!("go_back -> {}", path.display());
        Ok(ToolOutput::image(path))
    }
}

// ============================================================================
// Current URL
// ============================================================================

/// Read the current page URL. The only tool returning text, and the only
/// one that neither stabilizes nor screenshots.
pub struct GetCurrentUrlTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl GetCurrentUrlTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "get_current_url",
                "Returns the current URL of the webpage.",
            ),
            manager,
        }
    }
}

#[async_trait]
impl Tool for GetCurrentUrlTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, _args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let driver = require_driver(&self.manager).await?;
        let url = driver.current_url().await.map_err(driver_err)?;
        Ok(ToolOutput::text(url))
    }
}

// ============================================================================
// Zoom
// ============================================================================

#[derive(Debug, Deserialize)]
struct ZoomParams {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Magnify a region of the page.
pub struct ZoomTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
}

impl ZoomTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let definition = ToolDefinition::new(
            "zoom",
            "Magnifies a region of the page (bbox) so that it fills the entire viewport \
             and returns a screenshot.",
        )
        .with_param(ParamSpec::required(
            "x",
            ParamKind::Number,
            "Left X coordinate of the bbox, from 0 to 1000.",
        ))
        .with_param(ParamSpec::required(
            "y",
            ParamKind::Number,
            "Top Y coordinate of the bbox, from 0 to 1000.",
        ))
        .with_param(ParamSpec::required(
            "width",
            ParamKind::Number,
            "Width of the bbox.",
        ))
        .with_param(ParamSpec::required(
            "height",
            ParamKind::Number,
            "Height of the bbox.",
        ));
        Self { definition, manager }
    }
}

#[async_trait]
impl Tool for ZoomTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let params: ZoomParams = serde_json::from_value(args).map_err(invalid)?;

        let driver = require_driver(&self.manager).await?;
        let path = driver
            .zoom_region(params.x, params.y, params.width, params.height)
            .await
            .map_err(driver_err)?;

        debug!(
            "zoom({}, {}, {}x{}) -> {}",
            params.x,
            params.y,
            params.width,
            params.height,
            path.display()
        );
        Ok(ToolOutput::image(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<SessionManager> {
        Arc::new(SessionManager::new())
    }

    #[test]
    fn test_click_params_scalar_form() {
        let params: ClickParams =
            serde_json::from_value(json!({"x": 500, "y": 300})).unwrap();
        assert_eq!(params.point().unwrap(), (500.0, 300.0));
        assert_eq!(params.button().unwrap(), MouseButton::Left);
        assert_eq!(params.click_count, 1);
    }

    #[test]
    fn test_click_params_pair_form_overrides_y() {
        let params: ClickParams =
            serde_json::from_value(json!({"x": [120, 340], "y": 999})).unwrap();
        assert_eq!(params.point().unwrap(), (120.0, 340.0));

        // Pair form works without y at all.
        let params: ClickParams = serde_json::from_value(json!({"x": [120, 340]})).unwrap();
        assert_eq!(params.point().unwrap(), (120.0, 340.0));
    }

    #[test]
    fn test_click_params_scalar_requires_y() {
        let params: ClickParams = serde_json::from_value(json!({"x": 500})).unwrap();
        assert!(matches!(
            params.point(),
            Err(ToolError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_click_rejects_unknown_button() {
        let params: ClickParams =
            serde_json::from_value(json!({"x": 1, "y": 2, "button": "side"})).unwrap();
        assert!(params.button().is_err());
    }

    #[test]
    fn test_click_rejects_out_of_range_click_count() {
        let tool = ClickTool::new(manager());
        assert!(tool.validate(&json!({"x": 1, "y": 2, "click_count": 2})).is_ok());
        let err = tool
            .validate(&json!({"x": 1, "y": 2, "click_count": 7}))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
        assert!(tool.validate(&json!({"x": 1, "y": 2, "click_count": 0})).is_err());
    }

    #[test]
    fn test_click_validate_accepts_both_forms() {
        let tool = ClickTool::new(manager());
        assert!(tool.validate(&json!({"x": 10, "y": 20})).is_ok());
        assert!(tool.validate(&json!({"x": [10, 20]})).is_ok());
        assert!(tool.validate(&json!({"x": "ten", "y": 20})).is_err());
    }

    #[test]
    fn test_type_text_defaults() {
        let params: TypeTextParams =
            serde_json::from_value(json!({"text": "red sweater"})).unwrap();
        assert!(params.press_enter);
        assert!(params.clear_before);
        assert!(params.x.is_none());
    }

    #[test]
    fn test_scroll_defaults_to_page_down() {
        let params: ScrollParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.delta_x, 0.0);
        assert_eq!(params.delta_y, 800.0);
    }

    #[test]
    fn test_wait_default_ms() {
        let params: WaitParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.ms, 1000);
    }

    #[test]
    fn test_zoom_requires_all_bbox_fields() {
        let result: Result<ZoomParams, _> =
            serde_json::from_value(json!({"x": 100, "y": 100, "width": 200}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tools_without_session_report_not_ready() {
        let tool = GoBackTool::new(manager());
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::SessionNotReady(_)));
    }

    #[test]
    fn test_registration_exposes_all_tools() {
        let mut set = ToolSet::new();
        register_page_tools(&mut set, manager());
        let names = set.names();
        for expected in [
            "click",
            "get_current_url",
            "go_back",
            "scroll",
            "type_text",
            "wait",
            "zoom",
        ] {
            assert!(names.contains(&expected), "missing tool {}", expected);
        }
        assert_eq!(names.len(), 7);
    }
}
