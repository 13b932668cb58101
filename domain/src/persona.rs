//! Persona configuration and registry
//!
//! A persona is a named, statically configured agent role. Its
//! configuration is read-only at runtime and owned by the
//! [`PersonaRegistry`] built once at process start.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reasoning effort hint passed to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable configuration of a persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub system_prompt: String,
    /// Default model used when the request does not override it
    pub model: String,
    pub reasoning_effort: ReasoningEffort,
    /// Default max output tokens per invocation
    pub max_tokens: u64,
    /// Jobs allowed per workspace per hour (cascade rate window)
    pub rate_limit_per_hour: u64,
    /// Token budget per workspace per day
    pub daily_token_limit: u64,
    /// Feature tags this persona serves
    pub features: Vec<String>,
}

impl PersonaConfig {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: "claude-sonnet-4-5".to_string(),
            reasoning_effort: ReasoningEffort::Medium,
            max_tokens: 8_192,
            rate_limit_per_hour: 20,
            daily_token_limit: 500_000,
            features: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_rate_limit(mut self, per_hour: u64) -> Self {
        self.rate_limit_per_hour = per_hour;
        self
    }

    pub fn with_daily_token_limit(mut self, limit: u64) -> Self {
        self.daily_token_limit = limit;
        self
    }

    pub fn with_features(mut self, features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn serves_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Static lookup from persona name to its configuration
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: HashMap<String, PersonaConfig>,
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self {
            personas: HashMap::new(),
        }
    }

    /// Registry with the stock personas used by the research pipeline
    pub fn builtin() -> Self {
        Self::new()
            .register(
                PersonaConfig::new(
                    "researcher",
                    "You are a research agent. Map the landscape of a topic, \
                     read sources deeply, and write grounded reports with citations.",
                )
                .with_reasoning_effort(ReasoningEffort::High)
                .with_max_tokens(16_384)
                .with_features(["research-discovery", "research-synthesis"]),
            )
            .register(
                PersonaConfig::new(
                    "planner",
                    "You are a planning agent. Turn findings into a concrete, \
                     ordered plan with clear owners and milestones.",
                )
                .with_features(["plan"]),
            )
            .register(
                PersonaConfig::new(
                    "critic",
                    "You are a critical reviewer. Identify gaps, unsupported \
                     claims, and risks in the given document. Be specific.",
                )
                .with_max_tokens(4_096)
                .with_features(["critique"]),
            )
            .register(
                PersonaConfig::new(
                    "scorer",
                    "You are an evaluator. Score the given document against its \
                     rubric and respond with a JSON scorecard only.",
                )
                .with_reasoning_effort(ReasoningEffort::Low)
                .with_max_tokens(2_048)
                .with_features(["scorecard"]),
            )
    }

    pub fn register(mut self, persona: PersonaConfig) -> Self {
        self.personas.insert(persona.name.clone(), persona);
        self
    }

    /// Look up a persona, erroring on unknown names
    pub fn get(&self, name: &str) -> Result<&PersonaConfig, DomainError> {
        self.personas
            .get(name)
            .ok_or_else(|| DomainError::UnknownPersona(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(|s| s.as_str())
    }

    pub fn all(&self) -> impl Iterator<Item = &PersonaConfig> {
        self.personas.values()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
