//! Agentic runner
//!
//! A bounded tool-calling loop over the same admission preamble as the
//! one-shot runner. The model drives: each iteration it either answers
//! (natural stop) or requests tool calls, which are executed in
//! parallel and fed back into the transcript. The loop never exceeds
//! `max_iterations`; exhaustion returns the best content seen so far.

use super::{ExecutionRequest, admit};
use crate::error::RunnerError;
use crate::guardrails::Guardrails;
use crate::ports::{
    cascade_store::CascadeStore,
    job_store::{JobStore, JobUpdate},
    provider::{CompletionRequest, LlmProvider},
    tool::ToolPort,
    usage_store::UsageStore,
};
use chrono::Utc;
use futures::future::join_all;
use relay_domain::{ChatMessage, JobId, JobStatus, ToolInvocation, UsageEntry, cost_usd};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Loop tuning for one agentic run
#[derive(Debug, Clone)]
pub struct AgenticOptions {
    /// Hard cap on provider round-trips
    pub max_iterations: u32,
    /// Replace the persona's system prompt for this run only
    pub system_prompt_override: Option<String>,
    /// Persist the full transcript on the job row
    pub trace: bool,
}

impl Default for AgenticOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            system_prompt_override: None,
            trace: false,
        }
    }
}

/// One agentic run request
pub struct AgenticRequest {
    pub execution: ExecutionRequest,
    pub tools: Vec<Arc<dyn ToolPort>>,
    pub options: AgenticOptions,
}

impl AgenticRequest {
    pub fn new(execution: ExecutionRequest, tools: Vec<Arc<dyn ToolPort>>) -> Self {
        Self {
            execution,
            tools,
            options: AgenticOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AgenticOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of a completed agentic run
#[derive(Debug, Clone)]
pub struct AgenticOutput {
    pub job_id: JobId,
    pub content: String,
    /// Provider round-trips actually performed
    pub iterations: u32,
    /// Whether the model answered before the iteration cap
    pub natural_stop: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Guarded tool-calling runner
pub struct AgenticRunner<P, J, C, U>
where
    P: LlmProvider,
    J: JobStore,
    C: CascadeStore,
    U: UsageStore,
{
    registry: Arc<relay_domain::PersonaRegistry>,
    provider: Arc<P>,
    jobs: Arc<J>,
    guardrails: Arc<Guardrails<C, U>>,
}

impl<P, J, C, U> AgenticRunner<P, J, C, U>
where
    P: LlmProvider,
    J: JobStore,
    C: CascadeStore,
    U: UsageStore,
{
    pub fn new(
        registry: Arc<relay_domain::PersonaRegistry>,
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

    pub async fn run(&self, request: AgenticRequest) -> Result<AgenticOutput, RunnerError> {
        let admission = admit(
            &self.registry,
            &self.jobs,
            &self.guardrails,
            &request.execution,
        )
        .await?;

        let system_prompt = request
            .options
            .system_prompt_override
            .clone()
            .unwrap_or_else(|| admission.persona.system_prompt.clone());
        let definitions: Vec<_> = request
            .tools
            .iter()
            .map(|t| t.definition().clone())
            .collect();

        let mut transcript = vec![ChatMessage::user(&request.execution.context)];
        let mut total_input = 0u64;
        let mut total_output = 0u64;
        let mut last_content = String::new();
        let mut iterations = 0u32;
        let mut natural_stop = false;

        while iterations < request.options.max_iterations {
            iterations += 1;

            let completion = CompletionRequest {
                model: admission.persona.model.clone(),
                system_prompt: system_prompt.clone(),
                messages: transcript.clone(),
                max_tokens: admission.max_tokens,
                reasoning_effort: admission.reasoning_effort,
                tools: definitions.clone(),
            };

            let response = match self.provider.complete(completion).await {
                Ok(response) => {
                    self.guardrails.breaker.record_success();
                    response
                }
                Err(err) => {
                    self.guardrails.breaker.record_failure();
                    self.record_usage(&request.execution, &admission, total_input, total_output)
                        .await;
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

            total_input += response.input_tokens;
            total_output += response.output_tokens;
            if !response.content.is_empty() {
                last_content = response.content.clone();
            }
            transcript.push(ChatMessage::assistant(&response.content));

            if response.tool_calls.is_empty() {
                natural_stop = true;
                break;
            }

            debug!(
                job = %admission.job_id,
                iteration = iterations,
                calls = response.tool_calls.len(),
                "dispatching tool calls"
            );
            let results = join_all(
                response
                    .tool_calls
                    .iter()
                    .map(|call| dispatch(&request.tools, call)),
            )
            .await;
            for (call, result) in response.tool_calls.iter().zip(results) {
                transcript.push(ChatMessage::tool_result(&call.id, result));
            }
        }

        if !natural_stop {
            warn!(
                job = %admission.job_id,
                max_iterations = request.options.max_iterations,
                "iteration cap reached, returning last content"
            );
        }

        self.record_usage(&request.execution, &admission, total_input, total_output)
            .await;

        let cost = cost_usd(&admission.persona.model, total_input, total_output);
        let mut output = json!({
            "content": last_content,
            "iterations": iterations,
        });
        if request.options.trace {
            output["transcript"] = serde_json::to_value(&transcript).unwrap_or_default();
        }
        self.jobs
            .update_status(
                &admission.job_id,
                JobStatus::Completed,
                JobUpdate {
                    output: Some(output),
                    error: None,
                    input_tokens: Some(total_input),
                    output_tokens: Some(total_output),
                    cost_usd: Some(cost),
                },
            )
            .await?;

        Ok(AgenticOutput {
            job_id: admission.job_id,
            content: last_content,
            iterations,
            natural_stop,
            input_tokens: total_input,
            output_tokens: total_output,
        })
    }

    async fn record_usage(
        &self,
        request: &ExecutionRequest,
        admission: &super::Admission,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        if input_tokens == 0 && output_tokens == 0 {
            return;
        }
        let entry = UsageEntry {
            workspace_id: request.workspace_id.clone(),
            persona: admission.persona.name.clone(),
            feature: request.feature.clone(),
            input_tokens,
            output_tokens,
            cost_usd: cost_usd(&admission.persona.model, input_tokens, output_tokens),
            recorded_at: Utc::now(),
        };
        if let Err(err) = self.guardrails.budget.record(entry).await {
            warn!(job = %admission.job_id, error = %err, "failed to record usage");
        }
    }
}

/// Execute one tool call. Unknown tools and tool failures both come back
/// as text for the model, never as a runner error.
async fn dispatch(tools: &[Arc<dyn ToolPort>], call: &ToolInvocation) -> String {
    let Some(tool) = tools.iter().find(|t| t.definition().name == call.name) else {
        return format!("tool '{}' is not available", call.name);
    };
    match tool.execute(call.arguments.clone()).await {
        Ok(result) => result,
        Err(err) => format!("tool '{}' failed: {}", call.name, err),
    }
}
