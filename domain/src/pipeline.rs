//! Client-visible pipeline stage
//!
//! The stage is a *view* for polling clients, reconstructed from job
//! existence and recency. It is never a source of truth.

use serde::{Deserialize, Serialize};

/// Observable stage of a research pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    #[default]
    Idle,
    Discovering,
    Synthesizing,
    Planning,
    Scoring,
    Done,
    Error,
}

impl PipelineStage {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Discovering => "discovering",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Planning => "planning",
            PipelineStage::Scoring => "scoring",
            PipelineStage::Done => "done",
            PipelineStage::Error => "error",
        }
    }

    /// Whether this stage represents a finished pipeline
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Error)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
