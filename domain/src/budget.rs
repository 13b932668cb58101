//! Budget snapshot and denial reasons
//!
//! A [`BudgetSnapshot`] is derived from the usage store for a single
//! guardrail evaluation and never cached beyond it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Usage and config looked up for one budget check
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSnapshot {
    /// Tokens recorded today for this (workspace, persona) pair
    pub daily_tokens_used: u64,
    /// USD recorded this month for the workspace
    pub monthly_spend_usd: f64,
    pub workspace_enabled: bool,
    pub monthly_budget_usd: f64,
}

/// Workspace-level budget configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceBudget {
    pub enabled: bool,
    pub monthly_budget_usd: f64,
}

impl Default for WorkspaceBudget {
    fn default() -> Self {
        Self {
            enabled: true,
            monthly_budget_usd: 100.0,
        }
    }
}

/// Distinguishable reasons a budget check denies a call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BudgetDenial {
    #[error("workspace {workspace_id} is disabled")]
    WorkspaceDisabled { workspace_id: String },

    #[error(
        "feature {feature} allows at most {ceiling} tokens per call, {requested} requested"
    )]
    FeatureCeiling {
        feature: String,
        ceiling: u64,
        requested: u64,
    },

    #[error(
        "persona {persona} daily token limit reached: {used} used of {limit}, {requested} requested"
    )]
    DailyTokenLimit {
        persona: String,
        used: u64,
        limit: u64,
        requested: u64,
    },

    #[error("workspace monthly budget reached: {spent_usd:.2} USD of {budget_usd:.2} USD")]
    MonthlyBudget { spent_usd: f64, budget_usd: f64 },
}
