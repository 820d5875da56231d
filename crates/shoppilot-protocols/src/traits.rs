//! Tool trait definition.

use async_trait::async_trait;

use crate::definition::ToolDefinition;
use crate::error::ToolError;
use crate::output::ToolOutput;

/// Core trait for page-action tools.
///
/// A tool wraps one driver primitive behind a declared name and parameter
/// schema. `call` receives the raw serialized argument object from the
/// orchestrator; validation and default application happen before the
/// driver is touched.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Validate the arguments before execution.
    ///
    /// The default checks required fields and primitive types against the
    /// declared schema; tools with alternate calling forms override this.
    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        self.definition().validate_args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ParamKind, ParamSpec};
    use serde_json::json;

    struct EchoTool {
        definition: ToolDefinition,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                definition: ToolDefinition::new("echo", "Echoes its input").with_param(
                    ParamSpec::required("text", ParamKind::String, "Text to echo"),
                ),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
            let text = args["text"].as_str().unwrap_or_default().to_string();
            Ok(ToolOutput::text(text))
        }
    }

    #[test]
    fn test_default_validate_uses_schema() {
        let tool = EchoTool::new();
        assert!(tool.validate(&json!({"text": "hi"})).is_ok());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_call() {
        let tool = EchoTool::new();
        let out = tool.call(json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, ToolOutput::text("hi"));
    }
}
