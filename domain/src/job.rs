//! Job entities
//!
//! A [`Job`] is the persisted record of one guarded LLM invocation. Job
//! rows are created at guardrail-pass (or guardrail-reject) time and are
//! append-only thereafter: status and output updates only, never deleted
//! by this runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a persisted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a job
///
/// Transitions are one-way: `Queued -> Running -> {Completed, Failed,
/// Cancelled}`. A queued job may also fail (guardrail rejection) or be
/// cancelled before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Whether moving to `next` is a legal one-way transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => matches!(
                next,
                JobStatus::Running | JobStatus::Failed | JobStatus::Cancelled
            ),
            JobStatus::Running => next.is_terminal(),
            // Terminal states never move again
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new job row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub workspace_id: String,
    pub persona: String,
    pub feature: String,
    /// Identifier of the thing this job operates on (topic, thread, ...)
    pub target_id: String,
    /// Free-form context and parameters supplied by the caller
    pub input: serde_json::Value,
    /// Cascade distance from the human-triggered root (root = 0)
    pub depth: u32,
}

/// A persisted record of one guarded LLM invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub workspace_id: String,
    pub persona: String,
    pub feature: String,
    pub target_id: String,
    pub status: JobStatus,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub depth: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a queued job from its creation input
    pub fn from_new(id: JobId, new: NewJob) -> Self {
        Self {
            id,
            workspace_id: new.workspace_id,
            persona: new.persona,
            feature: new.feature,
            target_id: new.target_id,
            status: JobStatus::Queued,
            input: new.input,
            output: None,
            error: None,
            depth: new.depth,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}
