//! Shared test doubles: a scripted provider, in-memory stores, and a
//! harness wiring them into runners with default guardrails.

use crate::guardrails::{
    Guardrails,
    budget::TokenBudgetManager,
    cascade::{CascadeGuard, CascadeLimits},
    circuit_breaker::CircuitBreaker,
};
use crate::pipeline::coordinator::{PipelineConfig, PipelineCoordinator};
use crate::ports::{
    StoreError,
    cascade_store::CascadeStore,
    job_store::{JobStore, JobUpdate},
    provider::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError},
    tool::{ToolError, ToolPort},
    usage_store::UsageStore,
};
use crate::runner::{agentic::AgenticRunner, execution::ExecutionRunner};
use async_trait::async_trait;
use chrono::Utc;
use relay_domain::{
    Job, JobId, JobStatus, NewJob, PersonaRegistry, ToolDefinition, UsageEntry, WorkspaceBudget,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Provider replaying a fixed script of responses
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Mutex<Option<(usize, Arc<Notify>)>>,
}

impl ScriptedProvider {
    pub fn replying(
        script: impl IntoIterator<Item = Result<CompletionResponse, ProviderError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Hold the nth call (zero-based) until the returned handle is
    /// notified, so a test can act while that call is in flight.
    pub fn hold_call(&self, n: usize) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((n, notify.clone()));
        notify
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The nth request the provider received
    pub fn request(&self, n: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let held = self
            .gate
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(n, _)| *n == index)
            .map(|(_, notify)| notify.clone());
        if let Some(notify) = held {
            notify.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::RequestFailed("script exhausted".to_string())))
    }
}

/// In-memory job store enforcing one-way status transitions
#[derive(Default)]
pub struct MockJobStore {
    jobs: Mutex<Vec<Job>>,
    seq: AtomicU64,
}

impl MockJobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    fn find(&self, id: &JobId) -> Option<Job> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|job| &job.id == id)
            .cloned()
    }
}

#[async_trait]
impl JobStore for MockJobStore {
    async fn create_job(&self, new: NewJob) -> Result<JobId, StoreError> {
        let id = JobId::new(format!("job-{}", self.seq.fetch_add(1, Ordering::SeqCst) + 1));
        self.jobs
            .lock()
            .unwrap()
            .push(Job::from_new(id.clone(), new));
        Ok(id)
    }

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        update: JobUpdate,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
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
    }

    async fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.find(id))
    }

    async fn jobs_for_target(&self, target_id: &str) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| job.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn cancel_active(&self, target_id: &str) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
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

/// Cascade store reading depths from the job store
pub struct MockCascadeStore {
    jobs: Arc<MockJobStore>,
    recent: AtomicU64,
}

impl MockCascadeStore {
    pub fn new(jobs: Arc<MockJobStore>) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            recent: AtomicU64::new(0),
        })
    }

    pub fn set_recent(&self, count: u64) {
        self.recent.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl CascadeStore for MockCascadeStore {
    async fn parent_depth(&self, job_id: &JobId) -> Result<Option<u32>, StoreError> {
        Ok(self.jobs.find(job_id).map(|job| job.depth))
    }

    async fn count_recent_jobs(
        &self,
        _workspace_id: &str,
        _persona: &str,
        _window: Duration,
    ) -> Result<u64, StoreError> {
        Ok(self.recent.load(Ordering::SeqCst))
    }
}

/// In-memory usage store with settable balances
#[derive(Default)]
pub struct MockUsageStore {
    daily: Mutex<HashMap<(String, String), u64>>,
    monthly: Mutex<HashMap<String, f64>>,
    configs: Mutex<HashMap<String, WorkspaceBudget>>,
    entries: Mutex<Vec<UsageEntry>>,
}

impl MockUsageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn disable_workspace(&self, workspace_id: &str) {
        self.configs.lock().unwrap().insert(
            workspace_id.to_string(),
            WorkspaceBudget {
                enabled: false,
                ..Default::default()
            },
        );
    }

    pub fn set_daily_usage(&self, workspace_id: &str, persona: &str, tokens: u64) {
        self.daily
            .lock()
            .unwrap()
            .insert((workspace_id.to_string(), persona.to_string()), tokens);
    }

    pub fn recorded_entries(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl UsageStore for MockUsageStore {
    async fn daily_token_usage(
        &self,
        workspace_id: &str,
        persona: &str,
    ) -> Result<u64, StoreError> {
        Ok(self
            .daily
            .lock()
            .unwrap()
            .get(&(workspace_id.to_string(), persona.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn monthly_spend(&self, workspace_id: &str) -> Result<f64, StoreError> {
        Ok(self
            .monthly
            .lock()
            .unwrap()
            .get(workspace_id)
            .copied()
            .unwrap_or(0.0))
    }

    async fn workspace_config(&self, workspace_id: &str) -> Result<WorkspaceBudget, StoreError> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .get(workspace_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_usage(&self, entry: UsageEntry) -> Result<(), StoreError> {
        *self
            .daily
            .lock()
            .unwrap()
            .entry((entry.workspace_id.clone(), entry.persona.clone()))
            .or_insert(0) += entry.total_tokens();
        *self
            .monthly
            .lock()
            .unwrap()
            .entry(entry.workspace_id.clone())
            .or_insert(0.0) += entry.cost_usd;
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Tool echoing its `text` argument back
pub struct EchoTool {
    definition: ToolDefinition,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new("echo", "Echo the given text"),
        }
    }
}

#[async_trait]
impl ToolPort for EchoTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        Ok(arguments["text"].as_str().unwrap_or_default().to_string())
    }
}

/// Tool that always fails
pub struct FailingTool {
    definition: ToolDefinition,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self {
            definition: ToolDefinition::new(name, "Always fails"),
        }
    }
}

#[async_trait]
impl ToolPort for FailingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _arguments: Value) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed("boom".to_string()))
    }
}

/// Fully wired runtime over test doubles
pub struct Harness {
    pub registry: Arc<PersonaRegistry>,
    pub provider: Arc<ScriptedProvider>,
    pub jobs: Arc<MockJobStore>,
    pub cascade: Arc<MockCascadeStore>,
    pub usage: Arc<MockUsageStore>,
    pub guardrails: Arc<Guardrails<MockCascadeStore, MockUsageStore>>,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        let jobs = MockJobStore::new();
        let cascade = MockCascadeStore::new(jobs.clone());
        let usage = MockUsageStore::new();
        let guardrails = Arc::new(Guardrails::new(
            Arc::new(CircuitBreaker::default()),
            CascadeGuard::new(cascade.clone(), CascadeLimits::default()),
            TokenBudgetManager::new(usage.clone()),
        ));
        Self {
            registry: Arc::new(PersonaRegistry::builtin()),
            provider: Arc::new(provider),
            jobs,
            cascade,
            usage,
            guardrails,
        }
    }

    pub fn execution_runner(
        &self,
    ) -> Arc<ExecutionRunner<ScriptedProvider, MockJobStore, MockCascadeStore, MockUsageStore>>
    {
        Arc::new(ExecutionRunner::new(
            self.registry.clone(),
            self.provider.clone(),
            self.jobs.clone(),
            self.guardrails.clone(),
        ))
    }

    pub fn agentic_runner(
        &self,
    ) -> Arc<AgenticRunner<ScriptedProvider, MockJobStore, MockCascadeStore, MockUsageStore>> {
        Arc::new(AgenticRunner::new(
            self.registry.clone(),
            self.provider.clone(),
            self.jobs.clone(),
            self.guardrails.clone(),
        ))
    }

    pub fn coordinator(
        &self,
        config: PipelineConfig,
    ) -> PipelineCoordinator<ScriptedProvider, MockJobStore, MockCascadeStore, MockUsageStore>
    {
        PipelineCoordinator::new(
            self.execution_runner(),
            self.agentic_runner(),
            self.jobs.clone(),
            Vec::new(),
            config,
        )
    }
}
