//! Domain layer for persona-relay
//!
//! This crate contains the core entities and pure logic of the guarded
//! persona-job runtime. It has no dependencies on the async runtime,
//! stores, or providers.
//!
//! # Core Concepts
//!
//! ## Persona
//!
//! A named, statically configured agent role (model, prompt, limits).
//! Personas are immutable at runtime and owned by a [`PersonaRegistry`].
//!
//! ## Job
//!
//! One persisted, guarded invocation of a persona. Every call through the
//! runtime produces exactly one job row, whether it was accepted or
//! rejected by a guardrail.
//!
//! ## Cascade
//!
//! A chain of jobs where one job's completion triggers another; `depth`
//! tracks chain length from the human-triggered root (depth 0).

pub mod budget;
pub mod core;
pub mod job;
pub mod limits;
pub mod persona;
pub mod pipeline;
pub mod pricing;
pub mod reading_list;
pub mod scorecard;
pub mod tool;
pub mod usage;

// Re-export commonly used types
pub use budget::{BudgetDenial, BudgetSnapshot, WorkspaceBudget};
pub use core::error::DomainError;
pub use job::{Job, JobId, JobStatus, NewJob};
pub use limits::{DEFAULT_FEATURE_TOKEN_CEILING, feature_token_ceiling};
pub use persona::{PersonaConfig, PersonaRegistry, ReasoningEffort};
pub use pipeline::PipelineStage;
pub use pricing::{ModelPricing, cost_usd, pricing_for};
pub use reading_list::{MAX_REQUIRED_SOURCES, ReadingList, SourceRef};
pub use scorecard::{Scorecard, ScorecardCriterion, parse_scorecard};
pub use tool::{ChatMessage, Role, ToolDefinition, ToolInvocation};
pub use usage::UsageEntry;
