//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Conversion methods turn them into the runtime types the application
//! layer expects.

use relay_application::{CascadeLimits, CircuitBreakerConfig, PipelineConfig};
use relay_domain::{PersonaRegistry, WorkspaceBudget};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Raw guardrail configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGuardrailConfig {
    /// Consecutive provider failures before the circuit opens
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a half-open trial
    pub cooldown_seconds: u64,
    /// Maximum cascade distance from a human-triggered root
    pub max_cascade_depth: u32,
    /// Window in seconds for the per-persona rate check
    pub rate_window_seconds: u64,
    /// Trigger tags denied for every persona
    pub blocked_trigger_tags: Vec<String>,
}

impl Default for FileGuardrailConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_seconds: 60,
            max_cascade_depth: 3,
            rate_window_seconds: 3600,
            blocked_trigger_tags: Vec::new(),
        }
    }
}

/// Raw budget configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBudgetConfig {
    pub enabled: bool,
    pub monthly_budget_usd: f64,
}

impl Default for FileBudgetConfig {
    fn default() -> Self {
        let defaults = WorkspaceBudget::default();
        Self {
            enabled: defaults.enabled,
            monthly_budget_usd: defaults.monthly_budget_usd,
        }
    }
}

/// Raw pipeline configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub critique_retries: u32,
    pub retry_base_delay_ms: u64,
    pub stage_timeout_seconds: u64,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            critique_retries: defaults.critique_retries,
            retry_base_delay_ms: defaults.retry_base_delay.as_millis() as u64,
            stage_timeout_seconds: defaults.stage_timeout.as_secs(),
        }
    }
}

/// Per-persona overrides from TOML. Unset fields keep the builtin
/// values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersonaConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u64>,
    pub rate_limit_per_hour: Option<u64>,
    pub daily_token_limit: Option<u64>,
}

/// Full raw configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub guardrails: FileGuardrailConfig,
    pub budget: FileBudgetConfig,
    pub pipeline: FilePipelineConfig,
    /// Keyed by persona name
    pub personas: HashMap<String, FilePersonaConfig>,
}

impl FileConfig {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.guardrails.failure_threshold,
            cooldown: Duration::from_secs(self.guardrails.cooldown_seconds),
        }
    }

    pub fn cascade_limits(&self) -> CascadeLimits {
        CascadeLimits {
            max_depth: self.guardrails.max_cascade_depth,
            window: Duration::from_secs(self.guardrails.rate_window_seconds),
            blocked_trigger_tags: self.guardrails.blocked_trigger_tags.clone(),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            critique_retries: self.pipeline.critique_retries,
            retry_base_delay: Duration::from_millis(self.pipeline.retry_base_delay_ms),
            stage_timeout: Duration::from_secs(self.pipeline.stage_timeout_seconds),
            ..Default::default()
        }
    }

    pub fn workspace_budget(&self) -> WorkspaceBudget {
        WorkspaceBudget {
            enabled: self.budget.enabled,
            monthly_budget_usd: self.budget.monthly_budget_usd,
        }
    }

    /// Builtin personas with file overrides applied
    pub fn persona_registry(&self) -> PersonaRegistry {
        let mut registry = PersonaRegistry::builtin();
        for (name, overrides) in &self.personas {
            let Ok(base) = registry.get(name) else {
                continue;
            };
            let mut persona = base.clone();
            if let Some(model) = &overrides.model {
                persona = persona.with_model(model);
            }
            if let Some(max_tokens) = overrides.max_tokens {
                persona = persona.with_max_tokens(max_tokens);
            }
            if let Some(rate) = overrides.rate_limit_per_hour {
                persona = persona.with_rate_limit(rate);
            }
            if let Some(limit) = overrides.daily_token_limit {
                persona = persona.with_daily_token_limit(limit);
            }
            registry = registry.register(persona);
        }
        registry
    }
}
