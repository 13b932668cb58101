//! Runner errors
//!
//! Guardrail rejection is modeled as an error variant so callers can
//! `?` it, but it carries the human-readable denial reason and is
//! distinguishable from real failures via [`RunnerError::is_rejection`].

use crate::ports::{StoreError, provider::ProviderError};
use relay_domain::DomainError;
use thiserror::Error;

/// Errors produced by the runners and the pipeline coordinator
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    /// The call was denied by a guardrail before reaching the provider
    #[error("Blocked by guardrail: {0}")]
    Rejected(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Persona {persona} returned invalid output, please retry: {detail}")]
    StructuredOutput { persona: String, detail: String },

    #[error("Cancelled")]
    Cancelled,
}

impl RunnerError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, RunnerError::Rejected(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunnerError::Cancelled)
    }
}

impl From<DomainError> for RunnerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownPersona(name) => RunnerError::UnknownPersona(name),
            DomainError::StructuredOutput { persona, detail } => {
                RunnerError::StructuredOutput { persona, detail }
            }
            DomainError::Cancelled => RunnerError::Cancelled,
            DomainError::InvalidTransition { from, to } => {
                RunnerError::Store(StoreError::IllegalTransition {
                    job_id: "<unknown>".to_string(),
                    from,
                    to,
                })
            }
        }
    }
}
