//! Token budget manager
//!
//! Enforces three independent caps before any spend occurs: the
//! feature-level token ceiling, the persona daily token ceiling, and the
//! workspace monthly USD ceiling, plus the workspace `enabled` veto. All
//! lookups happen per check; nothing is cached across evaluations.

use crate::ports::{StoreError, usage_store::UsageStore};
use relay_domain::{BudgetDenial, BudgetSnapshot, PersonaConfig, UsageEntry, feature_token_ceiling};
use std::sync::Arc;

/// Outcome of a budget check
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetDecision {
    Allowed,
    Denied(BudgetDenial),
}

impl BudgetDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BudgetDecision::Allowed)
    }
}

/// Budget guardrail over a [`UsageStore`]
pub struct TokenBudgetManager<U: UsageStore> {
    store: Arc<U>,
}

impl<U: UsageStore> TokenBudgetManager<U> {
    pub fn new(store: Arc<U>) -> Self {
        Self { store }
    }

    /// Run all caps for one prospective call. Any single failure denies
    /// the whole execution with a distinguishable reason.
    pub async fn check(
        &self,
        workspace_id: &str,
        persona: &PersonaConfig,
        feature: &str,
        requested_tokens: u64,
    ) -> Result<BudgetDecision, StoreError> {
        let config = self.store.workspace_config(workspace_id).await?;
        if !config.enabled {
            return Ok(BudgetDecision::Denied(BudgetDenial::WorkspaceDisabled {
                workspace_id: workspace_id.to_string(),
            }));
        }

        let ceiling = feature_token_ceiling(feature);
        if requested_tokens > ceiling {
            return Ok(BudgetDecision::Denied(BudgetDenial::FeatureCeiling {
                feature: feature.to_string(),
                ceiling,
                requested: requested_tokens,
            }));
        }

        let used = self
            .store
            .daily_token_usage(workspace_id, &persona.name)
            .await?;
        if used + requested_tokens > persona.daily_token_limit {
            return Ok(BudgetDecision::Denied(BudgetDenial::DailyTokenLimit {
                persona: persona.name.clone(),
                used,
                limit: persona.daily_token_limit,
                requested: requested_tokens,
            }));
        }

        let spent = self.store.monthly_spend(workspace_id).await?;
        if spent >= config.monthly_budget_usd {
            return Ok(BudgetDecision::Denied(BudgetDenial::MonthlyBudget {
                spent_usd: spent,
                budget_usd: config.monthly_budget_usd,
            }));
        }

        Ok(BudgetDecision::Allowed)
    }

    /// Record spend after a successful provider call so subsequent
    /// checks see updated totals.
    pub async fn record(&self, entry: UsageEntry) -> Result<(), StoreError> {
        self.store.record_usage(entry).await
    }

    /// Current usage view for a (workspace, persona) pair. Derived per
    /// call, never cached.
    pub async fn snapshot(
        &self,
        workspace_id: &str,
        persona: &str,
    ) -> Result<BudgetSnapshot, StoreError> {
        let config = self.store.workspace_config(workspace_id).await?;
        Ok(BudgetSnapshot {
            daily_tokens_used: self.store.daily_token_usage(workspace_id, persona).await?,
            monthly_spend_usd: self.store.monthly_spend(workspace_id).await?,
            workspace_enabled: config.enabled,
            monthly_budget_usd: config.monthly_budget_usd,
        })
    }
}
