//! Application layer for persona-relay
//!
//! This crate composes the domain entities into the guarded job runtime:
//!
//! - **Ports**: traits the runtime requires from its collaborators
//!   (LLM provider, tools, job/cascade/usage stores). Adapters live in
//!   the infrastructure layer.
//! - **Guardrails**: circuit breaker, cascade guard, and token budget
//!   manager. Every execution passes through all three before a single
//!   provider token is spent.
//! - **Runners**: [`ExecutionRunner`] (one-shot) and [`AgenticRunner`]
//!   (bounded tool-calling loop), both producing exactly one job row per
//!   call.
//! - **Pipeline**: [`PipelineCoordinator`] chains Discovery, Synthesis,
//!   Critique, Plan, and Scorecard jobs with fire-and-forget
//!   continuations and cooperative cancellation.

pub mod error;
pub mod guardrails;
pub mod pipeline;
pub mod ports;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::RunnerError;
pub use guardrails::{
    Guardrails,
    budget::{BudgetDecision, TokenBudgetManager},
    cascade::{CascadeCheck, CascadeDecision, CascadeGuard, CascadeLimits},
    circuit_breaker::{BreakerCheck, CircuitBreaker, CircuitBreakerConfig, CircuitState},
};
pub use pipeline::{
    coordinator::{PipelineConfig, PipelineCoordinator, ResearchRequest, ResearchOutput},
    retry::poll_retry,
};
pub use ports::{
    StoreError,
    cascade_store::CascadeStore,
    job_store::{JobStore, JobUpdate},
    provider::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError},
    tool::{ToolError, ToolPort},
    usage_store::UsageStore,
};
pub use runner::{
    ExecutionRequest,
    agentic::{AgenticOptions, AgenticOutput, AgenticRequest, AgenticRunner},
    execution::{ExecutionOutput, ExecutionRunner},
};
