//! Circuit breaker
//!
//! Process-wide failure tracker that stops sending requests to a failing
//! provider. One explicit instance is constructed at process start and
//! injected into every runner; it is shared across all workspaces and
//! personas.
//!
//! States: `Closed` (normal) -> `Open` (reject immediately) after N
//! consecutive failures -> `HalfOpen` (exactly one trial) once the
//! cooldown elapses. A successful trial closes the breaker; a failed
//! trial re-opens it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker tuning
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive provider failures before the breaker opens
    pub failure_threshold: u32,
    /// Time the breaker stays open before admitting a half-open trial
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Breaker state visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerCheck {
    Allowed,
    Rejected { remaining_cooldown: Duration },
}

impl BreakerCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BreakerCheck::Allowed)
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// In `HalfOpen`, set while the single admitted trial is outstanding
    trial_in_flight: bool,
}

/// Process-wide circuit breaker
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Current state. Pure read, performs no transition.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Admission check for one execution.
    ///
    /// In `Open`, moves to `HalfOpen` once the cooldown has elapsed and
    /// admits the single trial; concurrent half-open callers are
    /// rejected until the trial's outcome is recorded.
    pub fn check(&self) -> BreakerCheck {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => BreakerCheck::Allowed,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.cooldown {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    BreakerCheck::Allowed
                } else {
                    BreakerCheck::Rejected {
                        remaining_cooldown: self.config.cooldown - elapsed,
                    }
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    BreakerCheck::Rejected {
                        remaining_cooldown: Duration::ZERO,
                    }
                } else {
                    inner.trial_in_flight = true;
                    BreakerCheck::Allowed
                }
            }
        }
    }

    /// Record a successful provider call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    /// Record a failed provider call.
    ///
    /// Guardrail rejections must not be recorded here: a rejected call
    /// never reached the provider.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
            }
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }

    /// Release an admitted half-open trial that never reached the
    /// provider (e.g. a store error between admission and dispatch).
    pub(crate) fn abandon_trial(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
