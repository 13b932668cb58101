//! Cascade guard
//!
//! Prevents runaway agent-triggers-agent loops and excessive automated
//! fan-out. A denial is a first-class decision with a human-readable
//! reason, never an error.

use crate::ports::{StoreError, cascade_store::CascadeStore};
use relay_domain::{JobId, PersonaConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cascade limits applied to every spawn decision
#[derive(Debug, Clone)]
pub struct CascadeLimits {
    /// Maximum cascade distance from a human-triggered root
    pub max_depth: u32,
    /// Window for the per-persona rate check
    pub window: Duration,
    /// Trigger tags that always deny, regardless of persona
    pub blocked_trigger_tags: Vec<String>,
}

impl Default for CascadeLimits {
    fn default() -> Self {
        Self {
            max_depth: 3,
            window: Duration::from_secs(60 * 60),
            blocked_trigger_tags: Vec::new(),
        }
    }
}

/// Outcome of a cascade check. Carries the computed depth either way so
/// the rejected job row can still be recorded with it.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeDecision {
    Allowed { depth: u32 },
    Denied { depth: u32, reason: String },
}

impl CascadeDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CascadeDecision::Allowed { .. })
    }

    pub fn depth(&self) -> u32 {
        match self {
            CascadeDecision::Allowed { depth } | CascadeDecision::Denied { depth, .. } => *depth,
        }
    }
}

/// Inputs for one cascade check
#[derive(Debug)]
pub struct CascadeCheck<'a> {
    pub workspace_id: &'a str,
    pub persona: &'a PersonaConfig,
    /// `None` for manually/human-triggered jobs
    pub parent_job_id: Option<&'a JobId>,
    /// Tags of the event that caused this job (empty for manual triggers)
    pub trigger_tags: &'a [String],
}

/// Guard deciding whether a new job may spawn
pub struct CascadeGuard<C: CascadeStore> {
    store: Arc<C>,
    limits: CascadeLimits,
}

impl<C: CascadeStore> CascadeGuard<C> {
    pub fn new(store: Arc<C>, limits: CascadeLimits) -> Self {
        Self { store, limits }
    }

    /// Decide whether this job is allowed to spawn.
    ///
    /// Checks, in order: cascade depth, per-persona rate over the
    /// window, then the trigger-tag rules. A persona never re-triggers
    /// itself: a trigger tag of `authored-by:<persona>` denies when it
    /// names the persona being triggered.
    pub async fn check(&self, check: CascadeCheck<'_>) -> Result<CascadeDecision, StoreError> {
        let depth = match check.parent_job_id {
            Some(parent) => match self.store.parent_depth(parent).await? {
                Some(parent_depth) => parent_depth + 1,
                None => {
                    debug!(parent = %parent, "parent job unknown, treating as root");
                    0
                }
            },
            None => 0,
        };

        if depth > self.limits.max_depth {
            return Ok(CascadeDecision::Denied {
                depth,
                reason: format!(
                    "cascade depth {} exceeds limit {}",
                    depth, self.limits.max_depth
                ),
            });
        }

        let recent = self
            .store
            .count_recent_jobs(check.workspace_id, &check.persona.name, self.limits.window)
            .await?;
        if recent >= check.persona.rate_limit_per_hour {
            return Ok(CascadeDecision::Denied {
                depth,
                reason: format!(
                    "persona {} ran {} jobs in the last {}s (limit {})",
                    check.persona.name,
                    recent,
                    self.limits.window.as_secs(),
                    check.persona.rate_limit_per_hour
                ),
            });
        }

        let self_trigger = format!("authored-by:{}", check.persona.name);
        for tag in check.trigger_tags {
            if *tag == self_trigger {
                return Ok(CascadeDecision::Denied {
                    depth,
                    reason: format!(
                        "persona {} may not re-trigger itself (tag {})",
                        check.persona.name, tag
                    ),
                });
            }
            if self.limits.blocked_trigger_tags.contains(tag) {
                return Ok(CascadeDecision::Denied {
                    depth,
                    reason: format!("trigger tag {} is blocked", tag),
                });
            }
        }

        Ok(CascadeDecision::Allowed { depth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeCascadeStore {
        depths: Mutex<HashMap<String, u32>>,
        recent: Mutex<u64>,
    }

    impl FakeCascadeStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                depths: Mutex::new(HashMap::new()),
                recent: Mutex::new(0),
            })
        }

        fn set_depth(&self, job: &str, depth: u32) {
            self.depths.lock().unwrap().insert(job.to_string(), depth);
        }

        fn set_recent(&self, count: u64) {
            *self.recent.lock().unwrap() = count;
        }
    }

    #[async_trait]
    impl CascadeStore for FakeCascadeStore {
        async fn parent_depth(&self, job_id: &JobId) -> Result<Option<u32>, StoreError> {
            Ok(self.depths.lock().unwrap().get(job_id.as_str()).copied())
        }

        async fn count_recent_jobs(
            &self,
            _workspace_id: &str,
            _persona: &str,
            _window: Duration,
        ) -> Result<u64, StoreError> {
            Ok(*self.recent.lock().unwrap())
        }
    }

    fn persona() -> PersonaConfig {
        PersonaConfig::new("critic", "review things").with_rate_limit(10)
    }

    #[tokio::test]
    async fn test_root_job_has_depth_zero() {
        let store = FakeCascadeStore::new();
        let guard = CascadeGuard::new(store, CascadeLimits::default());
        let persona = persona();
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: None,
                trigger_tags: &[],
            })
            .await
            .unwrap();
        assert_eq!(decision, CascadeDecision::Allowed { depth: 0 });
    }

    #[tokio::test]
    async fn test_child_depth_is_parent_plus_one() {
        let store = FakeCascadeStore::new();
        store.set_depth("job-p", 1);
        let guard = CascadeGuard::new(store, CascadeLimits::default());
        let persona = persona();
        let parent = JobId::new("job-p");
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: Some(&parent),
                trigger_tags: &[],
            })
            .await
            .unwrap();
        assert_eq!(decision, CascadeDecision::Allowed { depth: 2 });
    }

    #[tokio::test]
    async fn test_depth_limit_denies() {
        let store = FakeCascadeStore::new();
        store.set_depth("job-p", 3);
        let guard = CascadeGuard::new(store, CascadeLimits::default());
        let persona = persona();
        let parent = JobId::new("job-p");
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: Some(&parent),
                trigger_tags: &[],
            })
            .await
            .unwrap();
        assert!(!decision.is_allowed());
        assert_eq!(decision.depth(), 4);
    }

    #[tokio::test]
    async fn test_rate_limit_denies() {
        let store = FakeCascadeStore::new();
        store.set_recent(10);
        let guard = CascadeGuard::new(store, CascadeLimits::default());
        let persona = persona();
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: None,
                trigger_tags: &[],
            })
            .await
            .unwrap();
        match decision {
            CascadeDecision::Denied { reason, .. } => assert!(reason.contains("limit 10")),
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_persona_may_not_retrigger_itself() {
        let store = FakeCascadeStore::new();
        let guard = CascadeGuard::new(store, CascadeLimits::default());
        let persona = persona();
        let tags = vec!["authored-by:critic".to_string()];
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: None,
                trigger_tags: &tags,
            })
            .await
            .unwrap();
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn test_other_personas_tags_are_allowed() {
        let store = FakeCascadeStore::new();
        let guard = CascadeGuard::new(store, CascadeLimits::default());
        let persona = persona();
        let tags = vec!["authored-by:researcher".to_string()];
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: None,
                trigger_tags: &tags,
            })
            .await
            .unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_blocked_tag_denies() {
        let store = FakeCascadeStore::new();
        let limits = CascadeLimits {
            blocked_trigger_tags: vec!["bulk-import".to_string()],
            ..Default::default()
        };
        let guard = CascadeGuard::new(store, limits);
        let persona = persona();
        let tags = vec!["bulk-import".to_string()];
        let decision = guard
            .check(CascadeCheck {
                workspace_id: "ws-1",
                persona: &persona,
                parent_job_id: None,
                trigger_tags: &tags,
            })
            .await
            .unwrap();
        assert!(!decision.is_allowed());
    }
}
