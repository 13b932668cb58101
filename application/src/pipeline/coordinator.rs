//! Pipeline coordinator
//!
//! Orchestrates the research flow for one topic:
//!
//! ```text
//! Discovery (agentic, tools)
//!   -> Synthesis (agentic, reading assignment + findings)
//!        -> Critique (detached, critic persona)
//!        -> Plan (optional chain) -> Plan critique (detached)
//!             -> Scorecard
//! ```
//!
//! Critiques are fire-and-forget side branches: their failures are
//! logged and never propagate to the caller. The plan chain is detached
//! too, but its failures mark the topic's stage as `Error` since the
//! caller asked for it.

use crate::error::RunnerError;
use crate::ports::{
    cascade_store::CascadeStore, job_store::JobStore, provider::LlmProvider, tool::ToolPort,
    usage_store::UsageStore,
};
use crate::runner::{
    ExecutionRequest,
    agentic::{AgenticOptions, AgenticRequest, AgenticRunner},
    execution::ExecutionRunner,
};
use relay_domain::{Job, JobId, JobStatus, PipelineStage, ReadingList, parse_scorecard};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DISCOVERY_PROMPT: &str = "You are mapping the landscape of a research topic. \
     Use the available tools to find primary sources. Finish with a source list: \
     one source per line, url then title, marking optional ones with [OPTIONAL].";

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Read attempts when a critique polls for its target's output
    pub critique_retries: u32,
    pub retry_base_delay: Duration,
    /// Cap on each detached plan-chain stage
    pub stage_timeout: Duration,
    /// System prompt override for the discovery run
    pub discovery_system_prompt: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            critique_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            stage_timeout: Duration::from_secs(600),
            discovery_system_prompt: Some(DISCOVERY_PROMPT.to_string()),
        }
    }
}

/// One research pipeline invocation
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub workspace_id: String,
    /// Target id shared by every job in the flow
    pub topic_id: String,
    pub topic: String,
    /// Continue into plan and scorecard after synthesis
    pub auto_plan: bool,
}

/// What the caller gets back once synthesis lands. Detached
/// continuations may still be running.
#[derive(Debug, Clone)]
pub struct ResearchOutput {
    pub discovery_job_id: JobId,
    pub synthesis_job_id: JobId,
    pub report: String,
    pub reading_list: ReadingList,
}

/// Coordinator over both runners for the research flow
pub struct PipelineCoordinator<P, J, C, U>
where
    P: LlmProvider + 'static,
    J: JobStore + 'static,
    C: CascadeStore + 'static,
    U: UsageStore + 'static,
{
    execution: Arc<ExecutionRunner<P, J, C, U>>,
    agentic: Arc<AgenticRunner<P, J, C, U>>,
    jobs: Arc<J>,
    tools: Vec<Arc<dyn ToolPort>>,
    config: PipelineConfig,
    /// Live stage per topic; topics not in flight fall back to the job
    /// history.
    stages: Arc<Mutex<HashMap<String, PipelineStage>>>,
    cancellation: CancellationToken,
}

impl<P, J, C, U> PipelineCoordinator<P, J, C, U>
where
    P: LlmProvider + 'static,
    J: JobStore + 'static,
    C: CascadeStore + 'static,
    U: UsageStore + 'static,
{
    pub fn new(
        execution: Arc<ExecutionRunner<P, J, C, U>>,
        agentic: Arc<AgenticRunner<P, J, C, U>>,
        jobs: Arc<J>,
        tools: Vec<Arc<dyn ToolPort>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            execution,
            agentic,
            jobs,
            tools,
            config,
            stages: Arc::new(Mutex::new(HashMap::new())),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run discovery and synthesis for a topic, spawning the critique
    /// and (optionally) the plan chain as detached continuations.
    pub async fn run_research(
        &self,
        request: ResearchRequest,
    ) -> Result<ResearchOutput, RunnerError> {
        self.set_stage(&request.topic_id, PipelineStage::Discovering);

        let discovery = match self
            .agentic
            .run(
                AgenticRequest::new(
                    ExecutionRequest::new(
                        &request.workspace_id,
                        "researcher",
                        "research-discovery",
                        &request.topic_id,
                        &request.topic,
                    ),
                    self.tools.clone(),
                )
                .with_options(AgenticOptions {
                    system_prompt_override: self.config.discovery_system_prompt.clone(),
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(output) => output,
            Err(err) => {
                self.set_stage(&request.topic_id, PipelineStage::Error);
                return Err(err);
            }
        };

        let reading_list = ReadingList::parse(&discovery.content);
        info!(
            topic = %request.topic_id,
            required = reading_list.required.len(),
            optional = reading_list.optional.len(),
            "discovery complete"
        );

        self.ensure_live(&request.topic_id)?;
        self.set_stage(&request.topic_id, PipelineStage::Synthesizing);

        let synthesis_context = format!(
            "Write a grounded report on: {}\n\n{}\n\n## Discovery findings\n\n{}",
            request.topic,
            reading_list.assignment_block(),
            discovery.content
        );
        let synthesis = match self
            .agentic
            .run(AgenticRequest::new(
                ExecutionRequest::new(
                    &request.workspace_id,
                    "researcher",
                    "research-synthesis",
                    &request.topic_id,
                    synthesis_context,
                )
                .with_parent(discovery.job_id.clone()),
                self.tools.clone(),
            ))
            .await
        {
            Ok(output) => output,
            Err(err) => {
                self.set_stage(&request.topic_id, PipelineStage::Error);
                return Err(err);
            }
        };

        // Side branch: critique of the synthesis, authored by researcher
        spawn_critique(
            self.execution.clone(),
            self.jobs.clone(),
            self.config.clone(),
            request.workspace_id.clone(),
            request.topic_id.clone(),
            synthesis.job_id.clone(),
            "researcher",
        );

        if request.auto_plan {
            self.spawn_plan_chain(&request, synthesis.job_id.clone());
        } else {
            self.set_stage(&request.topic_id, PipelineStage::Done);
        }

        Ok(ResearchOutput {
            discovery_job_id: discovery.job_id,
            synthesis_job_id: synthesis.job_id,
            report: synthesis.content,
            reading_list,
        })
    }

    /// Detached plan -> plan-critique -> scorecard chain
    fn spawn_plan_chain(&self, request: &ResearchRequest, synthesis_job_id: JobId) {
        self.set_stage(&request.topic_id, PipelineStage::Planning);

        let execution = self.execution.clone();
        let jobs = self.jobs.clone();
        let config = self.config.clone();
        let stages = self.stages.clone();
        let cancellation = self.cancellation.clone();
        let workspace_id = request.workspace_id.clone();
        let topic_id = request.topic_id.clone();

        tokio::spawn(async move {
            // A removed stage entry means the topic was cancelled while
            // this chain was in flight; stand down without touching it.
            let live = || {
                !cancellation.is_cancelled()
                    && stages
                        .lock()
                        .map(|map| map.contains_key(&topic_id))
                        .unwrap_or(true)
            };
            let set = |stage: PipelineStage| {
                if let Ok(mut map) = stages.lock() {
                    if !map.contains_key(&topic_id) {
                        return;
                    }
                    if stage == PipelineStage::Done {
                        map.remove(&topic_id);
                    } else {
                        map.insert(topic_id.clone(), stage);
                    }
                }
            };

            if !live() {
                return;
            }
            let synthesis = match jobs.job(&synthesis_job_id).await {
                Ok(Some(job)) => job,
                other => {
                    warn!(topic = %topic_id, ?other, "synthesis job unavailable for planning");
                    set(PipelineStage::Error);
                    return;
                }
            };
            let report = job_content(&synthesis);

            let plan_request = ExecutionRequest::new(
                &workspace_id,
                "planner",
                "plan",
                &topic_id,
                format!("Turn these findings into a concrete plan:\n\n{}", report),
            )
            .with_parent(synthesis_job_id.clone())
            .with_trigger_tags(["authored-by:researcher"]);

            let plan = match timeout(config.stage_timeout, execution.execute(plan_request)).await {
                Ok(Ok(output)) => output,
                Ok(Err(err)) => {
                    if live() {
                        warn!(topic = %topic_id, error = %err, "plan stage failed");
                        set(PipelineStage::Error);
                    } else {
                        info!(topic = %topic_id, "plan chain stopped, topic cancelled");
                    }
                    return;
                }
                Err(_) => {
                    warn!(topic = %topic_id, "plan stage timed out");
                    set(PipelineStage::Error);
                    return;
                }
            };

            spawn_critique(
                execution.clone(),
                jobs.clone(),
                config.clone(),
                workspace_id.clone(),
                topic_id.clone(),
                plan.job_id.clone(),
                "planner",
            );

            if !live() {
                info!(topic = %topic_id, "plan chain stopped, topic cancelled");
                return;
            }
            set(PipelineStage::Scoring);
            let score_request = ExecutionRequest::new(
                &workspace_id,
                "scorer",
                "scorecard",
                &topic_id,
                format!("Score this plan against its rubric:\n\n{}", plan.content),
            )
            .with_parent(plan.job_id.clone());

            let scored =
                match timeout(config.stage_timeout, execution.execute(score_request)).await {
                    Ok(Ok(output)) => output,
                    Ok(Err(err)) => {
                        if live() {
                            warn!(topic = %topic_id, error = %err, "scorecard stage failed");
                            set(PipelineStage::Error);
                        } else {
                            info!(topic = %topic_id, "plan chain stopped, topic cancelled");
                        }
                        return;
                    }
                    Err(_) => {
                        warn!(topic = %topic_id, "scorecard stage timed out");
                        set(PipelineStage::Error);
                        return;
                    }
                };

            match parse_scorecard("scorer", &scored.content) {
                Ok(scorecard) => {
                    info!(topic = %topic_id, overall = scorecard.overall, "pipeline done");
                    set(PipelineStage::Done);
                }
                Err(err) => {
                    warn!(topic = %topic_id, error = %err, "scorecard output invalid");
                    set(PipelineStage::Error);
                }
            }
        });
    }

    /// Stage of a topic's pipeline. In-flight topics answer from the
    /// live map; everything else is reconstructed from job history.
    pub async fn phase(&self, topic_id: &str) -> Result<PipelineStage, RunnerError> {
        if let Some(stage) = self
            .stages
            .lock()
            .ok()
            .and_then(|map| map.get(topic_id).copied())
        {
            return Ok(stage);
        }

        let mut jobs = self.jobs.jobs_for_target(topic_id).await?;
        jobs.retain(|job| job.feature != "critique");
        jobs.sort_by_key(|job| job.created_at);
        // A cancelled most-recent job means the pipeline was stopped
        if jobs
            .last()
            .is_some_and(|job| job.status == JobStatus::Cancelled)
        {
            return Ok(PipelineStage::Idle);
        }
        jobs.retain(|job| job.status != JobStatus::Cancelled);
        Ok(derive_stage(jobs.last()))
    }

    /// Cancel everything in flight for a topic. Detached continuations
    /// notice via [`Self::ensure_live`] checks at stage boundaries.
    pub async fn cancel(&self, topic_id: &str) -> Result<u64, RunnerError> {
        if let Ok(mut map) = self.stages.lock() {
            map.remove(topic_id);
        }
        let cancelled = self.jobs.cancel_active(topic_id).await?;
        info!(topic = %topic_id, cancelled, "pipeline cancelled");
        Ok(cancelled)
    }

    /// Done topics are evicted from the live map so the job history
    /// becomes the source of truth again; a later run for the same
    /// topic is then visible through [`Self::phase`].
    fn set_stage(&self, topic_id: &str, stage: PipelineStage) {
        if let Ok(mut map) = self.stages.lock() {
            if stage == PipelineStage::Done {
                map.remove(topic_id);
            } else {
                map.insert(topic_id.to_string(), stage);
            }
        }
    }

    /// Cooperative cancellation check between stages. A topic whose
    /// stage entry vanished was cancelled.
    fn ensure_live(&self, topic_id: &str) -> Result<(), RunnerError> {
        if self.cancellation.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }
        let present = self
            .stages
            .lock()
            .map(|map| map.contains_key(topic_id))
            .unwrap_or(true);
        if present {
            Ok(())
        } else {
            Err(RunnerError::Cancelled)
        }
    }
}

/// Map the most recent relevant job to a stage
fn derive_stage(last: Option<&Job>) -> PipelineStage {
    let Some(job) = last else {
        return PipelineStage::Idle;
    };
    if job.status == JobStatus::Failed {
        return PipelineStage::Error;
    }
    match job.feature.as_str() {
        "research-discovery" => PipelineStage::Discovering,
        "research-synthesis" => {
            if job.status == JobStatus::Completed {
                PipelineStage::Done
            } else {
                PipelineStage::Synthesizing
            }
        }
        "plan" => PipelineStage::Planning,
        "scorecard" => {
            if job.status == JobStatus::Completed {
                PipelineStage::Done
            } else {
                PipelineStage::Scoring
            }
        }
        _ => PipelineStage::Idle,
    }
}

fn job_content(job: &Job) -> String {
    job.output
        .as_ref()
        .and_then(|output| output.get("content"))
        .and_then(|content| content.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Fire-and-forget critique of a just-written job. The reviewed job's
/// output may not be visible yet, so the read polls with backoff.
/// Failures are logged only.
fn spawn_critique<P, J, C, U>(
    execution: Arc<ExecutionRunner<P, J, C, U>>,
    jobs: Arc<J>,
    config: PipelineConfig,
    workspace_id: String,
    topic_id: String,
    reviewed_job_id: JobId,
    author: &'static str,
) where
    P: LlmProvider + 'static,
    J: JobStore + 'static,
    C: CascadeStore + 'static,
    U: UsageStore + 'static,
{
    tokio::spawn(async move {
        let document = super::retry::poll_retry(config.critique_retries, config.retry_base_delay, || {
            let jobs = jobs.clone();
            let id = reviewed_job_id.clone();
            async move {
                match jobs.job(&id).await {
                    Ok(Some(job)) if job.status == JobStatus::Completed => Ok(job_content(&job)),
                    Ok(_) => Err(RunnerError::Store(crate::ports::StoreError::NotFound(
                        id.to_string(),
                    ))),
                    Err(err) => Err(err.into()),
                }
            }
        })
        .await;

        let document = match document {
            Ok(document) => document,
            Err(err) => {
                warn!(reviewed = %reviewed_job_id, error = %err, "critique target unreadable");
                return;
            }
        };

        let request = ExecutionRequest::new(
            &workspace_id,
            "critic",
            "critique",
            &topic_id,
            format!("Review the following document:\n\n{}", document),
        )
        .with_parent(reviewed_job_id.clone())
        .with_trigger_tags([format!("authored-by:{}", author)]);

        if let Err(err) = execution.execute(request).await {
            warn!(reviewed = %reviewed_job_id, error = %err, "critique failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::provider::{CompletionResponse, ProviderError};
    use crate::test_support::{Harness, ScriptedProvider};

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            critique_retries: 2,
            retry_base_delay: Duration::ZERO,
            stage_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn request(auto_plan: bool) -> ResearchRequest {
        ResearchRequest {
            workspace_id: "ws-1".to_string(),
            topic_id: "topic-1".to_string(),
            topic: "quantum error correction".to_string(),
            auto_plan,
        }
    }

    fn discovery_reply() -> CompletionResponse {
        CompletionResponse::from_text(
            "Key sources:\n\
             - https://example.org/surface-codes Surface codes review\n\
             - https://example.org/ldpc [OPTIONAL] qLDPC overview\n",
        )
        .with_tokens(500, 200)
    }

    async fn settle() {
        // Let detached continuations run; delays in tests are zero.
        for _ in 0..200 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_research_orders_discovery_before_synthesis() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("the critique").with_tokens(100, 50)),
        ]));
        let coordinator = harness.coordinator(fast_config());

        let output = coordinator.run_research(request(false)).await.unwrap();

        assert_eq!(output.report, "the report");
        assert_eq!(output.reading_list.required.len(), 1);
        assert_eq!(output.reading_list.optional.len(), 1);

        let discovery = harness
            .jobs
            .job(&output.discovery_job_id)
            .await
            .unwrap()
            .unwrap();
        let synthesis = harness
            .jobs
            .job(&output.synthesis_job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(discovery.status, JobStatus::Completed);
        assert_eq!(synthesis.depth, discovery.depth + 1);
        assert!(synthesis.created_at >= discovery.created_at);

        // Synthesis context carries the reading assignment and findings
        let second = harness.provider.request(1);
        let user = &second.messages[0].content;
        assert!(user.contains("Reading assignment"));
        assert!(user.contains("surface-codes"));
    }

    #[tokio::test]
    async fn test_critique_runs_detached_with_synthesis_parent() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("the critique").with_tokens(100, 50)),
        ]));
        let coordinator = harness.coordinator(fast_config());

        let output = coordinator.run_research(request(false)).await.unwrap();
        settle().await;

        let jobs = harness.jobs.jobs_for_target("topic-1").await.unwrap();
        let critique = jobs.iter().find(|j| j.feature == "critique").unwrap();
        assert_eq!(critique.status, JobStatus::Completed);
        assert_eq!(critique.depth, 2);
        let synthesis = harness
            .jobs
            .job(&output.synthesis_job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(critique.depth, synthesis.depth + 1);
    }

    #[tokio::test]
    async fn test_critique_failure_does_not_fail_caller() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Err(ProviderError::Timeout),
        ]));
        let coordinator = harness.coordinator(fast_config());

        let output = coordinator.run_research(request(false)).await;
        assert!(output.is_ok());
        settle().await;

        // The topic still reads as done despite the failed side branch
        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Done
        );
    }

    #[tokio::test]
    async fn test_auto_plan_chain_reaches_done() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("synthesis critique").with_tokens(100, 50)),
            Ok(CompletionResponse::from_text("the plan").with_tokens(300, 200)),
            Ok(
                CompletionResponse::from_text("{\"overall\": 8.5, \"criteria\": []}")
                    .with_tokens(100, 50),
            ),
            Ok(CompletionResponse::from_text("plan critique").with_tokens(100, 50)),
        ]));
        let coordinator = harness.coordinator(fast_config());

        coordinator.run_research(request(true)).await.unwrap();
        settle().await;

        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Done
        );
        let jobs = harness.jobs.jobs_for_target("topic-1").await.unwrap();
        assert!(jobs.iter().any(|j| j.feature == "plan"));
        assert!(jobs.iter().any(|j| j.feature == "scorecard"));
        let plan = jobs.iter().find(|j| j.feature == "plan").unwrap();
        let scorecard = jobs.iter().find(|j| j.feature == "scorecard").unwrap();
        assert_eq!(plan.depth, 2);
        assert_eq!(scorecard.depth, 3);
    }

    #[tokio::test]
    async fn test_invalid_scorecard_marks_error() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("synthesis critique").with_tokens(100, 50)),
            Ok(CompletionResponse::from_text("the plan").with_tokens(300, 200)),
            Ok(CompletionResponse::from_text("not json at all").with_tokens(100, 50)),
            Ok(CompletionResponse::from_text("plan critique").with_tokens(100, 50)),
        ]));
        let coordinator = harness.coordinator(fast_config());

        coordinator.run_research(request(true)).await.unwrap();
        settle().await;

        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Error
        );
    }

    #[tokio::test]
    async fn test_cancel_clears_stage_and_active_jobs() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("the critique").with_tokens(100, 50)),
        ]));
        let coordinator = harness.coordinator(fast_config());

        coordinator.run_research(request(false)).await.unwrap();
        settle().await;
        coordinator.cancel("topic-1").await.unwrap();

        // No active jobs remained, so nothing to cancel, and the derived
        // view still reflects completed history.
        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Done
        );
    }

    #[tokio::test]
    async fn test_cancel_mid_flight_reads_idle() {
        let harness = Harness::new(ScriptedProvider::replying([]));
        let coordinator = harness.coordinator(fast_config());

        // A discovery job still running when the topic is cancelled
        let id = harness
            .jobs
            .create_job(relay_domain::NewJob {
                workspace_id: "ws-1".to_string(),
                persona: "researcher".to_string(),
                feature: "research-discovery".to_string(),
                target_id: "topic-9".to_string(),
                input: serde_json::json!({}),
                depth: 0,
            })
            .await
            .unwrap();
        harness
            .jobs
            .update_status(&id, JobStatus::Running, Default::default())
            .await
            .unwrap();

        let cancelled = coordinator.cancel("topic-9").await.unwrap();
        assert_eq!(cancelled, 1);
        // A cancelled most-recent job reads as idle
        assert_eq!(
            coordinator.phase("topic-9").await.unwrap(),
            PipelineStage::Idle
        );
    }

    #[tokio::test]
    async fn test_cancel_while_plan_in_flight_stays_idle() {
        let provider = ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("synthesis critique").with_tokens(100, 50)),
            Ok(CompletionResponse::from_text("the plan").with_tokens(300, 200)),
        ]);
        let release = provider.hold_call(3);
        let harness = Harness::new(provider);
        let coordinator = harness.coordinator(fast_config());

        coordinator.run_research(request(true)).await.unwrap();
        settle().await;

        // The plan call is held in flight; cancel underneath it
        coordinator.cancel("topic-1").await.unwrap();
        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Idle
        );

        release.notify_one();
        settle().await;

        // The late plan result lands on a cancelled row and the chain
        // stands down instead of resurrecting the topic as an error
        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Idle
        );
        let jobs = harness.jobs.jobs_for_target("topic-1").await.unwrap();
        let plan = jobs.iter().find(|j| j.feature == "plan").unwrap();
        assert_eq!(plan.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_new_run_after_done_reads_discovering() {
        let harness = Harness::new(ScriptedProvider::replying([
            Ok(discovery_reply()),
            Ok(CompletionResponse::from_text("the report").with_tokens(800, 400)),
            Ok(CompletionResponse::from_text("the critique").with_tokens(100, 50)),
        ]));
        let coordinator = harness.coordinator(fast_config());

        coordinator.run_research(request(false)).await.unwrap();
        settle().await;

        // A fresh discovery for the same topic supersedes the finished
        // run in the derived view
        let id = harness
            .jobs
            .create_job(relay_domain::NewJob {
                workspace_id: "ws-1".to_string(),
                persona: "researcher".to_string(),
                feature: "research-discovery".to_string(),
                target_id: "topic-1".to_string(),
                input: serde_json::json!({}),
                depth: 0,
            })
            .await
            .unwrap();
        harness
            .jobs
            .update_status(&id, JobStatus::Running, Default::default())
            .await
            .unwrap();

        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Discovering
        );
    }

    #[tokio::test]
    async fn test_phase_of_unknown_topic_is_idle() {
        let harness = Harness::new(ScriptedProvider::replying([]));
        let coordinator = harness.coordinator(fast_config());
        assert_eq!(
            coordinator.phase("nowhere").await.unwrap(),
            PipelineStage::Idle
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_sets_error_stage() {
        let harness = Harness::new(ScriptedProvider::replying([Err(
            ProviderError::RequestFailed("boom".to_string()),
        )]));
        let coordinator = harness.coordinator(fast_config());

        let err = coordinator.run_research(request(false)).await.unwrap_err();
        assert!(matches!(err, RunnerError::Provider(_)));
        assert_eq!(
            coordinator.phase("topic-1").await.unwrap(),
            PipelineStage::Error
        );
    }
}
