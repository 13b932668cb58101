//! Guardrails: the checks every execution passes before any spend
//!
//! Order is fixed: [`CascadeGuard`] -> [`TokenBudgetManager`] ->
//! [`CircuitBreaker`], first rejection short-circuits. Rejection is a
//! first-class outcome, recorded on the job row, never an exception.

pub mod budget;
pub mod cascade;
pub mod circuit_breaker;

use crate::ports::{cascade_store::CascadeStore, usage_store::UsageStore};
use budget::TokenBudgetManager;
use cascade::CascadeGuard;
use circuit_breaker::CircuitBreaker;
use std::sync::Arc;

/// The full guardrail chain, constructed once at process start and
/// shared by reference with every runner.
pub struct Guardrails<C: CascadeStore, U: UsageStore> {
    pub breaker: Arc<CircuitBreaker>,
    pub cascade: CascadeGuard<C>,
    pub budget: TokenBudgetManager<U>,
}

impl<C: CascadeStore, U: UsageStore> Guardrails<C, U> {
    pub fn new(
        breaker: Arc<CircuitBreaker>,
        cascade: CascadeGuard<C>,
        budget: TokenBudgetManager<U>,
    ) -> Self {
        Self {
            breaker,
            cascade,
            budget,
        }
    }
}
