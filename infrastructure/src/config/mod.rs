//! Configuration file loading for persona-relay
//!
//! This module handles file I/O and merging of configuration from
//! multiple sources. The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./relay.toml` or `./.relay.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/persona-relay/config.toml`
//! 4. Fallback: `~/.config/persona-relay/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileBudgetConfig, FileConfig, FileGuardrailConfig, FilePersonaConfig, FilePipelineConfig,
};
pub use loader::ConfigLoader;
