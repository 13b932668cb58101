//! Runners
//!
//! Both runners share one admission preamble: resolve the persona, run
//! the guardrail chain (cascade, budget, breaker, in that order), and
//! create the job row. Exactly one job row exists per call, whether it
//! was admitted or rejected. The breaker runs last so a half-open trial
//! slot is never consumed by a call the other guardrails would deny.

pub mod agentic;
pub mod execution;

use crate::error::RunnerError;
use crate::guardrails::{Guardrails, budget::BudgetDecision, cascade::CascadeCheck};
use crate::ports::{
    cascade_store::CascadeStore,
    job_store::{JobStore, JobUpdate},
    usage_store::UsageStore,
};
use relay_domain::{JobId, JobStatus, NewJob, PersonaConfig, PersonaRegistry, ReasoningEffort};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// One guarded execution request
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub workspace_id: String,
    pub persona: String,
    pub feature: String,
    /// The thing this call operates on (topic id, thread id, ...)
    pub target_id: String,
    /// Free-form context handed to the model as the user message
    pub context: String,
    /// Job that caused this one, `None` for human-triggered calls
    pub parent_job_id: Option<JobId>,
    /// Tags of the triggering event, empty for manual triggers
    pub trigger_tags: Vec<String>,
    /// Override the persona's default reasoning effort
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Override the persona's default max output tokens
    pub max_tokens: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(
        workspace_id: impl Into<String>,
        persona: impl Into<String>,
        feature: impl Into<String>,
        target_id: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            persona: persona.into(),
            feature: feature.into(),
            target_id: target_id.into(),
            context: context.into(),
            parent_job_id: None,
            trigger_tags: Vec::new(),
            reasoning_effort: None,
            max_tokens: None,
        }
    }

    pub fn with_parent(mut self, parent: JobId) -> Self {
        self.parent_job_id = Some(parent);
        self
    }

    pub fn with_trigger_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trigger_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    fn input_json(&self) -> serde_json::Value {
        json!({
            "context": self.context,
            "parent_job_id": self.parent_job_id.as_ref().map(JobId::as_str),
            "trigger_tags": self.trigger_tags,
        })
    }
}

/// An admitted execution: the job row exists and is `Running`
pub(crate) struct Admission {
    pub persona: PersonaConfig,
    pub job_id: JobId,
    pub depth: u32,
    pub max_tokens: u64,
    pub reasoning_effort: ReasoningEffort,
}

/// Shared guardrail preamble for both runners.
///
/// An unknown persona errors before any job row exists. Every other
/// outcome, allowed or denied, writes exactly one row: denials are
/// recorded as `Failed` with the denial reason, admissions as `Running`.
pub(crate) async fn admit<J, C, U>(
    registry: &PersonaRegistry,
    jobs: &Arc<J>,
    guardrails: &Guardrails<C, U>,
    request: &ExecutionRequest,
) -> Result<Admission, RunnerError>
where
    J: JobStore,
    C: CascadeStore,
    U: UsageStore,
{
    let persona = registry.get(&request.persona)?.clone();

    let cascade = guardrails
        .cascade
        .check(CascadeCheck {
            workspace_id: &request.workspace_id,
            persona: &persona,
            parent_job_id: request.parent_job_id.as_ref(),
            trigger_tags: &request.trigger_tags,
        })
        .await?;
    let depth = cascade.depth();
    if let crate::guardrails::cascade::CascadeDecision::Denied { reason, .. } = cascade {
        return reject(jobs, request, &persona, depth, reason).await;
    }

    let max_tokens = request.max_tokens.unwrap_or(persona.max_tokens);
    let budget = guardrails
        .budget
        .check(&request.workspace_id, &persona, &request.feature, max_tokens)
        .await?;
    if let BudgetDecision::Denied(denial) = budget {
        return reject(jobs, request, &persona, depth, denial.to_string()).await;
    }

    // Breaker runs last: a denied call must not consume the half-open
    // trial slot.
    let breaker = guardrails.breaker.check();
    if let crate::guardrails::circuit_breaker::BreakerCheck::Rejected { remaining_cooldown } =
        breaker
    {
        let reason = format!(
            "provider circuit is open, retry in {}s",
            remaining_cooldown.as_secs()
        );
        return reject(jobs, request, &persona, depth, reason).await;
    }

    let job_id = match jobs
        .create_job(NewJob {
            workspace_id: request.workspace_id.clone(),
            persona: persona.name.clone(),
            feature: request.feature.clone(),
            target_id: request.target_id.clone(),
            input: request.input_json(),
            depth,
        })
        .await
    {
        Ok(id) => id,
        Err(err) => {
            // If the breaker admitted a half-open trial, release it: the
            // provider was never called.
            guardrails.breaker.abandon_trial();
            return Err(err.into());
        }
    };

    if let Err(err) = jobs
        .update_status(&job_id, JobStatus::Running, JobUpdate::default())
        .await
    {
        guardrails.breaker.abandon_trial();
        return Err(err.into());
    }

    info!(
        job = %job_id,
        persona = %persona.name,
        feature = %request.feature,
        depth,
        "admitted"
    );

    let reasoning_effort = request.reasoning_effort.unwrap_or(persona.reasoning_effort);
    Ok(Admission {
        persona,
        job_id,
        depth,
        max_tokens,
        reasoning_effort,
    })
}

async fn reject<J: JobStore>(
    jobs: &Arc<J>,
    request: &ExecutionRequest,
    persona: &PersonaConfig,
    depth: u32,
    reason: String,
) -> Result<Admission, RunnerError> {
    let job_id = jobs
        .create_job(NewJob {
            workspace_id: request.workspace_id.clone(),
            persona: persona.name.clone(),
            feature: request.feature.clone(),
            target_id: request.target_id.clone(),
            input: request.input_json(),
            depth,
        })
        .await?;
    jobs.update_status(&job_id, JobStatus::Failed, JobUpdate::failed(&reason))
        .await?;
    info!(job = %job_id, persona = %persona.name, %reason, "rejected by guardrail");
    Err(RunnerError::Rejected(reason))
}
