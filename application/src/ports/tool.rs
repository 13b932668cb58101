//! Tool port
//!
//! A tool is a callable capability (search, fetch, ...) exposed to the
//! model during an agentic loop. Tool failures are per-call: they are
//! returned to the model as an error string in the transcript, never
//! aborting the whole run.

use async_trait::async_trait;
use relay_domain::ToolDefinition;
use thiserror::Error;

/// Errors from a single tool invocation
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Port for a capability callable by the model
#[async_trait]
pub trait ToolPort: Send + Sync {
    /// Definition advertised to the model
    fn definition(&self) -> &ToolDefinition;

    /// Execute one call and return the text handed back to the model
    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError>;
}
