//! Tool definition and typed parameter schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// Primitive type a tool parameter is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name for this kind.
    pub fn schema_type(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Check a JSON value against this kind.
    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// Declared parameter of a tool: name, primitive type, required flag and
/// an optional default applied when the orchestrator omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter with a declared default.
    pub fn optional(
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
        default: Value,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: Some(default),
        }
    }
}

/// Definition of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name the orchestrator calls the tool by.
    pub name: String,

    /// Description of what the tool does.
    pub description: String,

    /// Declared parameters, in schema order.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter to the schema.
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// Look up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Validate a serialized argument object against the declared schema.
    ///
    /// Missing required fields and wrong primitive types fail the call;
    /// undeclared extra fields are ignored the way the orchestrator's
    /// function-calling layer ignores them.
    pub fn validate_args(&self, args: &Value) -> Result<(), ToolError> {
        let obj = match args {
            Value::Object(map) => map,
            Value::Null if self.parameters.iter().all(|p| !p.required) => return Ok(()),
            _ => {
                return Err(ToolError::InvalidParameters(format!(
                    "{}: arguments must be an object",
                    self.name
                )));
            }
        };

        for spec in &self.parameters {
            match obj.get(&spec.name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(ToolError::InvalidParameters(format!(
                            "{}: parameter '{}' must be {}",
                            self.name,
                            spec.name,
                            spec.kind.schema_type()
                        )));
                    }
                }
                None if spec.required => {
                    return Err(ToolError::InvalidParameters(format!(
                        "{}: missing required parameter '{}'",
                        self.name, spec.name
                    )));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Apply declared defaults for omitted optional parameters, returning
    /// the completed argument object.
    pub fn apply_defaults(&self, args: Value) -> Value {
        let mut obj = match args {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for spec in &self.parameters {
            if let Some(default) = &spec.default {
                obj.entry(spec.name.clone()).or_insert_with(|| default.clone());
            }
        }
        Value::Object(obj)
    }

    /// Render as a function-calling schema entry.
    pub fn function_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for spec in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(spec.kind.schema_type().into()));
            prop.insert("description".into(), Value::String(spec.description.clone()));
            if let Some(default) = &spec.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(spec.name.clone(), Value::Object(prop));
            if spec.required {
                required.push(Value::String(spec.name.clone()));
            }
        }

        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn click_def() -> ToolDefinition {
        ToolDefinition::new("click", "Clicks at coordinates")
            .with_param(ParamSpec::required("x", ParamKind::Integer, "X coordinate"))
            .with_param(ParamSpec::required("y", ParamKind::Integer, "Y coordinate"))
            .with_param(ParamSpec::optional(
                "button",
                ParamKind::String,
                "Mouse button",
                json!("left"),
            ))
    }

    #[test]
    fn test_validate_ok() {
        let def = click_def();
        assert!(def.validate_args(&json!({"x": 10, "y": 20})).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let def = click_def();
        let err = def.validate_args(&json!({"x": 10})).unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_validate_wrong_type() {
        let def = click_def();
        let err = def.validate_args(&json!({"x": "ten", "y": 20})).unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_validate_not_an_object() {
        let def = click_def();
        assert!(def.validate_args(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_null_with_no_required_params() {
        let def = ToolDefinition::new("wait", "Waits").with_param(ParamSpec::optional(
            "ms",
            ParamKind::Integer,
            "Milliseconds",
            json!(1000),
        ));
        assert!(def.validate_args(&serde_json::Value::Null).is_ok());
    }

    #[test]
    fn test_validate_extra_fields_ignored() {
        let def = click_def();
        assert!(def
            .validate_args(&json!({"x": 1, "y": 2, "unknown": true}))
            .is_ok());
    }

    #[test]
    fn test_apply_defaults() {
        let def = click_def();
        let args = def.apply_defaults(json!({"x": 1, "y": 2}));
        assert_eq!(args["button"], json!("left"));
        assert_eq!(args["x"], json!(1));
    }

    #[test]
    fn test_apply_defaults_does_not_override() {
        let def = click_def();
        let args = def.apply_defaults(json!({"x": 1, "y": 2, "button": "right"}));
        assert_eq!(args["button"], json!("right"));
    }

    #[test]
    fn test_function_schema() {
        let schema = click_def().function_schema();
        assert_eq!(schema["name"], "click");
        assert_eq!(schema["parameters"]["properties"]["x"]["type"], "integer");
        assert_eq!(schema["parameters"]["required"], json!(["x", "y"]));
        assert_eq!(
            schema["parameters"]["properties"]["button"]["default"],
            json!("left")
        );
    }
}
