//! The `validate_candidate_item` tool.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use tracing::{debug, info};

use shoppilot_browser::SessionManager;
use shoppilot_protocols::{Tool, ToolDefinition, ToolError, ToolOutput};

use crate::candidates::CandidateList;
use crate::client::VisionClient;

/// Asks the classification service whether the page currently on screen
/// shows a product matching the user's query. On an "OK" verdict the
/// page's URL is recorded as a candidate. The verdict JSON is returned
/// verbatim as the tool's text output.
pub struct ValidateCandidateItemTool {
    definition: ToolDefinition,
    manager: Arc<SessionManager>,
    client: VisionClient,
    candidates: Arc<CandidateList>,
    /// The conversation's free-text product query; set by the
    /// orchestrator before the tool-calling loop starts.
    query: Mutex<Option<String>>,
}

impl ValidateCandidateItemTool {
    pub fn new(
        manager: Arc<SessionManager>,
        client: VisionClient,
        candidates: Arc<CandidateList>,
    ) -> Self {
        Self {
            definition: ToolDefinition::new(
                "validate_candidate_item",
                "Checks whether the product page currently on screen matches the user's \
                 request. Call this once you believe you have found a fitting product. \
                 Returns the validator's verdict.",
            ),
            manager,
            client,
            candidates,
            query: Mutex::new(None),
        }
    }

    /// Set the query the next validations run against.
    pub fn set_query(&self, query: impl Into<String>) {
        *self.query.lock() = Some(query.into());
    }

    /// Drop the stored query; validations fail until a new one is set.
    pub fn clear_query(&self) {
        *self.query.lock() = None;
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }
}

#[async_trait]
impl Tool for ValidateCandidateItemTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, _args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = self.query.lock().clone().ok_or_else(|| {
            ToolError::ExecutionFailed("no user query set for validation".to_string())
        })?;

        let driver = self.manager.current().await.ok_or_else(|| {
            ToolError::SessionNotReady("no live browser session".to_string())
        })?;

        let shot = driver
            .screenshot(None, false)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        let bytes = tokio::fs::read(&shot).await?;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);

        let verdict = self
            .client
            .validate(&image_base64, &query)
            .await
            .map_err(|e| ToolError::Collaborator(e.to_string()))?;

        if verdict.is_match() {
            let url = driver
                .current_url()
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
            info!("Candidate accepted: {}", url);
            self.candidates.push(url);
        } else {
            debug!("Candidate rejected: {}", verdict.comment);
        }

        let text = serde_json::to_string(&verdict)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolOutput::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool() -> ValidateCandidateItemTool {
        ValidateCandidateItemTool::new(
            Arc::new(SessionManager::new()),
            VisionClient::new("http://127.0.0.1:8100/classificator"),
            Arc::new(CandidateList::new()),
        )
    }

    #[tokio::test]
    async fn test_requires_a_query() {
        let err = tool().call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn test_clear_query_forgets_the_query() {
        let tool = tool();
        tool.set_query("red sweater");
        tool.clear_query();
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn test_requires_a_session() {
        let tool = tool();
        tool.set_query("red sweater");
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::SessionNotReady(_)));
    }

    #[test]
    fn test_definition_has_no_parameters() {
        let schema = tool().definition().function_schema();
        assert_eq!(schema["name"], "validate_candidate_item");
        assert!(schema["parameters"]["properties"]
            .as_object()
            .unwrap()
            .is_empty());
    }
}
