//! Infrastructure layer for persona-relay
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod stores;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileBudgetConfig, FileConfig, FileGuardrailConfig, FilePersonaConfig,
    FilePipelineConfig,
};
pub use stores::{InMemoryCascadeStore, InMemoryJobStore, InMemoryUsageStore};
#[cfg(feature = "web-tools")]
pub use tools::web::WebFetchTool;
