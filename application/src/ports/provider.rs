//! LLM provider port
//!
//! The runtime treats the provider wire protocol as a black box: one
//! request in, one response out, with token counts. Tool-calling turns
//! are expressed through `tools` on the request and `tool_calls` on the
//! response.

use async_trait::async_trait;
use relay_domain::{ChatMessage, ReasoningEffort, ToolDefinition, ToolInvocation};
use thiserror::Error;

/// Errors from the LLM provider
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// One completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u64,
    pub reasoning_effort: ReasoningEffort,
    /// Tool definitions offered to the model (empty for one-shot calls)
    pub tools: Vec<ToolDefinition>,
}

/// One completion response
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: String,
    /// Tool calls the model requests before it will produce a final answer
    pub tool_calls: Vec<ToolInvocation>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl CompletionResponse {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }
}

/// Gateway to the LLM provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, ProviderError>;
}
