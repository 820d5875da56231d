//! Tool call results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Exactly one output is produced per tool call: a freshly captured
/// screenshot reference or a text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Path to a screenshot written by the page driver.
    Image { path: PathBuf },
    /// Plain text value (e.g. the current URL or a verdict).
    Text { content: String },
}

impl ToolOutput {
    /// An image result.
    pub fn image(path: impl Into<PathBuf>) -> Self {
        ToolOutput::Image { path: path.into() }
    }

    /// A text result.
    pub fn text(content: impl Into<String>) -> Self {
        ToolOutput::Text {
            content: content.into(),
        }
    }

    /// The screenshot path, if this is an image result.
    pub fn image_path(&self) -> Option<&Path> {
        match self {
            ToolOutput::Image { path } => Some(path),
            ToolOutput::Text { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_roundtrip() {
        let out = ToolOutput::image("/tmp/shot-20250101-120000.png");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["type"], "image");
        let back: ToolOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn test_text_serializes_content() {
        let out = ToolOutput::text("https://marketplace.example/catalog");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["content"], "https://marketplace.example/catalog");
    }

    #[test]
    fn test_image_path_accessor() {
        let out = ToolOutput::image("/tmp/a.png");
        assert_eq!(out.image_path().unwrap(), Path::new("/tmp/a.png"));
        assert!(ToolOutput::text("x").image_path().is_none());
    }
}
