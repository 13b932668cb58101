//! Cascade store port
//!
//! Read-side collaborator of the [`CascadeGuard`](crate::CascadeGuard):
//! trigger provenance, parent-job depth, and recent-job counts.

use super::StoreError;
use async_trait::async_trait;
use relay_domain::JobId;
use std::time::Duration;

/// Port for cascade provenance lookups
#[async_trait]
pub trait CascadeStore: Send + Sync {
    /// Depth of the given parent job, or `None` if it is unknown
    async fn parent_depth(&self, job_id: &JobId) -> Result<Option<u32>, StoreError>;

    /// Number of jobs this persona ran in the workspace within the window
    async fn count_recent_jobs(
        &self,
        workspace_id: &str,
        persona: &str,
        window: Duration,
    ) -> Result<u64, StoreError>;
}
