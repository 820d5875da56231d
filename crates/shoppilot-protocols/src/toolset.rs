//! Tool registry and dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ToolError;
use crate::output::ToolOutput;
use crate::traits::Tool;

/// A named collection of tools consumed by the orchestrator loop.
///
/// Dispatch validates arguments and applies declared defaults before the
/// tool runs, so type errors are caught at this one chokepoint.
#[derive(Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name. Re-registering a name
    /// replaces the previous tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.definition().name.clone(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Names of all registered tools, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Function-calling schema entries for every registered tool.
    pub fn function_schemas(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|t| t.definition().function_schema())
            .collect()
    }

    /// Validate, apply defaults and execute one tool call.
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.validate(&args)?;
        let args = tool.definition().apply_defaults(args);
        tool.call(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ParamKind, ParamSpec, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedTool {
        definition: ToolDefinition,
    }

    impl FixedTool {
        fn new(name: &str) -> Self {
            Self {
                definition: ToolDefinition::new(name, "Returns its own name").with_param(
                    ParamSpec::optional("ms", ParamKind::Integer, "Delay", json!(1000)),
                ),
            }
        }
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn call(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
            // Defaults must already be applied by dispatch.
            assert_eq!(args["ms"], json!(1000));
            Ok(ToolOutput::text(self.definition.name.clone()))
        }
    }

    fn sample_set() -> ToolSet {
        let mut set = ToolSet::new();
        set.register(Arc::new(FixedTool::new("wait")));
        set.register(Arc::new(FixedTool::new("click")));
        set
    }

    #[test]
    fn test_names_sorted() {
        let set = sample_set();
        assert_eq!(set.names(), vec!["click", "wait"]);
    }

    #[test]
    fn test_function_schemas() {
        let set = sample_set();
        let schemas = set.function_schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0]["name"], "click");
    }

    #[tokio::test]
    async fn test_dispatch_applies_defaults() {
        let set = sample_set();
        let out = set.dispatch("wait", json!({})).await.unwrap();
        assert_eq!(out, ToolOutput::text("wait"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let set = sample_set();
        let err = set.dispatch("zoom", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_args() {
        let set = sample_set();
        let err = set.dispatch("wait", json!({"ms": "soon"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
