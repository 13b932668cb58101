//! Store adapters
//!
//! In-memory implementations of the job, cascade, and usage store
//! ports. They back the CLI and single-process deployments; a durable
//! adapter would implement the same traits.

mod memory;

pub use memory::{InMemoryCascadeStore, InMemoryJobStore, InMemoryUsageStore};
