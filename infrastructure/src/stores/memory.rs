//! In-memory store adapters
//!
//! Jobs live in insertion order behind one mutex; the cascade store
//! shares the job list so depth and rate lookups see the same rows the
//! runners write. Usage is kept as raw entries and aggregated per
//! lookup, so day and month boundaries need no rollover logic.

use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, Utc};
use relay_application::{CascadeStore, JobStore, JobUpdate, StoreError, UsageStore};
use relay_domain::{Job, JobId, JobStatus, NewJob, UsageEntry, WorkspaceBudget};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory [`JobStore`] enforcing one-way status transitions
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<Vec<Job>>,
    seq: AtomicU64,
}

impl InMemoryJobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_job<T>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut Job) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut jobs = self.jobs.lock().map_err(poisoned)?;
        let job = jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(job)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, new: NewJob) -> Result<JobId, StoreError> {
        let id = JobId::new(format!("job-{}", self.seq.fetch_add(1, Ordering::SeqCst) + 1));
        self.jobs
            .lock()
            .map_err(poisoned)?
            .push(Job::from_new(id.clone(), new));
        Ok(id)
    }

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        update: JobUpdate,
    ) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            if !job.status.can_transition_to(status) {
                return Err(StoreError::IllegalTransition {
                    job_id: id.to_string(),
                    from: job.status.to_string(),
                    to: status.to_string(),
                });
            }
            job.status = status;
            if status == JobStatus::Running {
                job.started_at = Some(Utc::now());
            }
            if status.is_terminal() {
                job.completed_at = Some(Utc::now());
            }
            if let Some(output) = update.output {
                job.output = Some(output);
            }
            if let Some(error) = update.error {
                job.error = Some(error);
            }
            if let Some(tokens) = update.input_tokens {
                job.input_tokens = tokens;
            }
            if let Some(tokens) = update.output_tokens {
                job.output_tokens = tokens;
            }
            if let Some(cost) = update.cost_usd {
                job.cost_usd = cost;
            }
            Ok(())
        })
    }

    async fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .map_err(poisoned)?
            .iter()
            .find(|job| &job.id == id)
            .cloned())
    }

    async fn jobs_for_target(&self, target_id: &str) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|job| job.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn cancel_active(&self, target_id: &str) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.lock().map_err(poisoned)?;
        let mut cancelled = 0;
        for job in jobs
            .iter_mut()
            .filter(|job| job.target_id == target_id && job.status.is_active())
        {
            job.status = JobStatus::Cancelled;
            job.completed_at = Some(Utc::now());
            cancelled += 1;
        }
        Ok(cancelled)
    }
}

/// [`CascadeStore`] reading provenance from the shared job list
pub struct InMemoryCascadeStore {
    jobs: Arc<InMemoryJobStore>,
}

impl InMemoryCascadeStore {
    pub fn new(jobs: Arc<InMemoryJobStore>) -> Arc<Self> {
        Arc::new(Self { jobs })
    }
}

#[async_trait]
impl CascadeStore for InMemoryCascadeStore {
    async fn parent_depth(&self, job_id: &JobId) -> Result<Option<u32>, StoreError> {
        Ok(self
            .jobs
            .jobs
            .lock()
            .map_err(poisoned)?
            .iter()
            .find(|job| &job.id == job_id)
            .map(|job| job.depth))
    }

    async fn count_recent_jobs(
        &self,
        workspace_id: &str,
        persona: &str,
        window: Duration,
    ) -> Result<u64, StoreError> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::hours(1));
        Ok(self
            .jobs
            .jobs
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|job| {
                job.workspace_id == workspace_id
                    && job.persona == persona
                    && job.created_at >= cutoff
            })
            .count() as u64)
    }
}

/// In-memory [`UsageStore`] aggregating raw entries per lookup
#[derive(Default)]
pub struct InMemoryUsageStore {
    entries: Mutex<Vec<UsageEntry>>,
    configs: Mutex<HashMap<String, WorkspaceBudget>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_workspace_config(&self, workspace_id: &str, config: WorkspaceBudget) {
        if let Ok(mut configs) = self.configs.lock() {
            configs.insert(workspace_id.to_string(), config);
        }
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn daily_token_usage(
        &self,
        workspace_id: &str,
        persona: &str,
    ) -> Result<u64, StoreError> {
        let today = Utc::now().date_naive();
        Ok(self
            .entries
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|entry| {
                entry.workspace_id == workspace_id
                    && entry.persona == persona
                    && entry.recorded_at.date_naive() == today
            })
            .map(UsageEntry::total_tokens)
            .sum())
    }

    async fn monthly_spend(&self, workspace_id: &str) -> Result<f64, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|entry| {
                entry.workspace_id == workspace_id
                    && entry.recorded_at.year() == now.year()
                    && entry.recorded_at.month() == now.month()
            })
            .map(|entry| entry.cost_usd)
            .sum())
    }

    async fn workspace_config(&self, workspace_id: &str) -> Result<WorkspaceBudget, StoreError> {
        Ok(self
            .configs
            .lock()
            .map_err(poisoned)?
            .get(workspace_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_usage(&self, entry: UsageEntry) -> Result<(), StoreError> {
        self.entries.lock().map_err(poisoned)?.push(entry);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}
