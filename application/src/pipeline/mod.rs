//! Research pipeline
//!
//! Chains Discovery, Synthesis, Critique, Plan, and Scorecard jobs over
//! the two runners. Critiques and the plan chain run as detached
//! continuations; their failures never fail the call that spawned them.

pub mod coordinator;
pub mod retry;
