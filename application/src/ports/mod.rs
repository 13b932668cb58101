//! Ports: interfaces the runtime requires from its collaborators
//!
//! Implementations (adapters) live in the infrastructure layer. The
//! stores behind these ports must provide consistent reads for the same
//! workspace and serialize concurrent budget-counter writes for the same
//! (workspace, persona) pair; that serialization is the collaborator's
//! contract, not this crate's.

pub mod cascade_store;
pub mod job_store;
pub mod provider;
pub mod tool;
pub mod usage_store;

use thiserror::Error;

/// Errors surfaced by store collaborators
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal status transition for job {job_id}: {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: String,
        to: String,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
