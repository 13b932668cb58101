//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{persona} returned invalid output, please retry: {detail}")]
    StructuredOutput { persona: String, detail: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
