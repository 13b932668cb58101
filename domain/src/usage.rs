//! Usage records handed to the usage store after a successful call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded spend event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    pub workspace_id: String,
    pub persona: String,
    pub feature: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub recorded_at: DateTime<Utc>,
}

impl UsageEntry {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
