//! Tool execution errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("No live session: {0}")]
    SessionNotReady(String),

    #[error("Collaborator call failed: {0}")]
    Collaborator(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
