//! # Shoppilot Protocols
//!
//! The tool invocation contract consumed by the function-calling
//! orchestrator. Contains only interface definitions and the argument
//! validation chokepoint - no browser code.
//!
//! ## Core pieces
//!
//! - [`Tool`] - trait implemented by every page action
//! - [`ToolDefinition`] / [`ParamSpec`] - declared name, description and
//!   typed parameter schema per tool
//! - [`ToolOutput`] - the single result of a call: an image reference or a
//!   text value
//! - [`ToolSet`] - name registry with dispatch and schema export

mod definition;
mod error;
mod output;
mod toolset;
mod traits;

pub use definition::{ParamKind, ParamSpec, ToolDefinition};
pub use error::ToolError;
pub use output::ToolOutput;
pub use toolset::ToolSet;
pub use traits::Tool;
