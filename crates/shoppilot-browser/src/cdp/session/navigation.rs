//! Navigation operations for the CDP page session.

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;

use super::core::PageSession;

impl PageSession {
    /// Navigate to a URL. Readiness is not awaited here; the stabilization
    /// policy decides when the page is observable.
    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result.get("errorText") {
            return Err(CdpError::NavigationFailed(
                error.as_str().unwrap_or("Unknown error").to_string(),
            ));
        }

        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Navigate one entry back in history. A no-op at the start of history.
    pub async fn history_back(&self) -> Result<(), CdpError> {
        let history = self.call("Page.getNavigationHistory", None).await?;
        let current_index = history["currentIndex"].as_i64().unwrap_or(0);

        if current_index > 0 {
            if let Some(entries) = history["entries"].as_array() {
                if let Some(entry) = entries.get((current_index - 1) as usize) {
                    let entry_id = entry["id"].as_i64().unwrap_or(0);
                    self.call(
                        "Page.navigateToHistoryEntry",
                        Some(json!({"entryId": entry_id})),
                    )
                    .await?;
                    debug!("History back to entry {}", entry_id);
                }
            }
        }
        Ok(())
    }

    /// Get the page's current URL.
    pub async fn current_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get the document's readiness state ("loading", "interactive" or
    /// "complete").
    pub async fn ready_state(&self) -> Result<String, CdpError> {
        let result = self.evaluate("document.readyState").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }
}
