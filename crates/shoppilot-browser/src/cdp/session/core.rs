//! Core session struct, CDP command dispatch and page setup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::cdp::client::{PendingRequest, WsSink};
use crate::cdp::error::CdpError;
use crate::cdp::protocol::{CdpRequest, ScreenshotFormat};

/// A session attached to a single page/target.
pub struct PageSession {
    /// Target ID.
    pub(crate) target_id: String,
    /// Session ID for this target.
    pub(crate) session_id: String,
    /// WebSocket sender (shared with client).
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// Pending requests (shared with client).
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Request ID counter (shared with client).
    request_id: Arc<AtomicU64>,
}

impl PageSession {
    /// Create a new page session.
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
        }
    }

    /// Get target ID.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Get session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", json);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Enable required CDP domains.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Network.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Pin the viewport to the given size in device-independent pixels.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1,
                "mobile": false,
            })),
        )
        .await?;
        Ok(())
    }

    /// Override the user agent for all requests from this page.
    pub async fn set_user_agent(&self, user_agent: &str) -> Result<(), CdpError> {
        self.call(
            "Network.setUserAgentOverride",
            Some(json!({"userAgent": user_agent})),
        )
        .await?;
        Ok(())
    }

    /// Capture a screenshot, returning base64-encoded image data.
    pub async fn capture_screenshot(
        &self,
        format: ScreenshotFormat,
        full_page: bool,
    ) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({
                    "format": format,
                    "captureBeyondViewport": full_page,
                })),
            )
            .await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }
}
