//! Job store port

use super::StoreError;
use async_trait::async_trait;
use relay_domain::{Job, JobId, JobStatus, NewJob};

/// Fields written alongside a status update
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost_usd: Option<f64>,
}

impl JobUpdate {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Port for persisting jobs
///
/// Implementations must enforce the one-way status transition rule
/// ([`JobStatus::can_transition_to`]).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, new: NewJob) -> Result<JobId, StoreError>;

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        update: JobUpdate,
    ) -> Result<(), StoreError>;

    async fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    async fn jobs_for_target(&self, target_id: &str) -> Result<Vec<Job>, StoreError>;

    /// Transition all queued/running jobs for a target to cancelled.
    /// Returns the number of jobs transitioned.
    async fn cancel_active(&self, target_id: &str) -> Result<u64, StoreError>;
}
