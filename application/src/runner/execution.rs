//! One-shot execution runner
//!
//! A single guarded provider call: admit, complete, settle the job row
//! and the usage ledger. No tools, no iteration.

use super::{ExecutionRequest, admit};
use crate::error::RunnerError;
use crate::guardrails::Guardrails;
use crate::ports::{
    cascade_store::CascadeStore,
    job_store::{JobStore, JobUpdate},
    provider::{CompletionRequest, LlmProvider},
    usage_store::UsageStore,
};
use chrono::Utc;
use relay_domain::{ChatMessage, JobId, JobStatus, PersonaRegistry, UsageEntry, cost_usd};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Result of a completed one-shot execution
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub job_id: JobId,
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One-shot guarded runner
pub struct ExecutionRunner<P, J, C, U>
where
    P: LlmProvider,
    J: JobStore,
    C: CascadeStore,
    U: UsageStore,
{
    registry: Arc<PersonaRegistry>,
    provider: Arc<P>,
    jobs: Arc<J>,
    guardrails: Arc<Guardrails<C, U>>,
}

impl<P, J, C, U> ExecutionRunner<P, J, C, U>
where
    P: LlmProvider,
    J: JobStore,
    C: CascadeStore,
    U: UsageStore,
{
    pub fn new(
        registry: Arc<PersonaRegistry>,
        provider: Arc<P>,
        jobs: Arc<J>,
        guardrails: Arc<Guardrails<C, U>>,
    ) -> Self {
        Self {
            registry,
            provider,
            jobs,
            guardrails,
        }
    }

    /// Run one guarded provider call.
    ///
    /// Rejections surface as [`RunnerError::Rejected`] with a `Failed`
    /// job row already written; the provider is never touched.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, RunnerError> {
        let admission = admit(&self.registry, &self.jobs, &self.guardrails, &request).await?;

        let completion = CompletionRequest {
            model: admission.persona.model.clone(),
            system_prompt: admission.persona.system_prompt.clone(),
            messages: vec![ChatMessage::user(&request.context)],
            max_tokens: admission.max_tokens,
            reasoning_effort: admission.reasoning_effort,
            tools: Vec::new(),
        };

        let response = match self.provider.complete(completion).await {
            Ok(response) => {
                self.guardrails.breaker.record_success();
                response
            }
            Err(err) => {
                self.guardrails.breaker.record_failure();
                self.jobs
                    .update_status(
                        &admission.job_id,
                        JobStatus::Failed,
                        JobUpdate::failed(err.to_string()),
                    )
                    .await?;
                return Err(err.into());
            }
        };

        let cost = cost_usd(
            &admission.persona.model,
            response.input_tokens,
            response.output_tokens,
        );
        if let Err(err) = self
            .guardrails
            .budget
            .record(UsageEntry {
                workspace_id: request.workspace_id.clone(),
                persona: admission.persona.name.clone(),
                feature: request.feature.clone(),
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
                cost_usd: cost,
                recorded_at: Utc::now(),
            })
            .await
        {
            // The call already happened; usage bookkeeping must not void
            // the result.
            warn!(job = %admission.job_id, error = %err, "failed to record usage");
        }

        self.jobs
            .update_status(
                &admission.job_id,
                JobStatus::Completed,
                JobUpdate {
                    output: Some(json!({ "content": response.content })),
                    error: None,
                    input_tokens: Some(response.input_tokens),
                    output_tokens: Some(response.output_tokens),
                    cost_usd: Some(cost),
                },
            )
            .await?;

        Ok(ExecutionOutput {
            job_id: admission.job_id,
            content: response.content,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        })
    }
}
