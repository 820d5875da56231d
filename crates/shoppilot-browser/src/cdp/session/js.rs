//! JavaScript execution operations for the CDP page session.

use serde_json::{json, Value};

use crate::cdp::error::CdpError;

use super::core::PageSession;

impl PageSession {
    /// Evaluate a JavaScript expression, awaiting promises.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }
}
