//! Usage store port
//!
//! Spend bookkeeping behind the
//! [`TokenBudgetManager`](crate::TokenBudgetManager). Record-then-check
//! must be consistent within one (workspace, persona); the store supplies
//! that serialization.

use super::StoreError;
use async_trait::async_trait;
use relay_domain::{UsageEntry, WorkspaceBudget};

/// Port for usage and workspace-budget lookups
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Tokens recorded today for this (workspace, persona)
    async fn daily_token_usage(&self, workspace_id: &str, persona: &str)
    -> Result<u64, StoreError>;

    /// USD recorded this month for the workspace
    async fn monthly_spend(&self, workspace_id: &str) -> Result<f64, StoreError>;

    async fn workspace_config(&self, workspace_id: &str) -> Result<WorkspaceBudget, StoreError>;

    async fn record_usage(&self, entry: UsageEntry) -> Result<(), StoreError>;
}
