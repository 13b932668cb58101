//! Scorecard parsing from scorer output
//!
//! The scorer persona is expected to emit a JSON scorecard. Supports two
//! formats: a ```json fenced block, or the whole response being valid
//! JSON. A response that parses as neither is a structured-output
//! failure, surfaced distinctly so the caller can ask for a retry.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// One scored criterion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScorecardCriterion {
    pub name: String,
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
}

/// Structured evaluation of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scorecard {
    pub overall: f64,
    #[serde(default)]
    pub criteria: Vec<ScorecardCriterion>,
}

/// Parse a scorecard from scorer response text.
///
/// Returns [`DomainError::StructuredOutput`] when no valid scorecard can
/// be recovered.
pub fn parse_scorecard(persona: &str, response: &str) -> Result<Scorecard, DomainError> {
    // Look for ```json ... ``` blocks first
    let mut in_json_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();
        if !in_json_block && trimmed == "```json" {
            in_json_block = true;
            current_block.clear();
        } else if in_json_block && trimmed == "```" {
            in_json_block = false;
            if let Ok(card) = serde_json::from_str::<Scorecard>(&current_block) {
                return Ok(card);
            }
        } else if in_json_block {
            current_block.push_str(line);
            current_block.push('\n');
        }
    }

    // Try the entire response as JSON
    if let Ok(card) = serde_json::from_str::<Scorecard>(response.trim()) {
        return Ok(card);
    }

    Err(DomainError::StructuredOutput {
        persona: persona.to_string(),
        detail: "no parseable scorecard JSON in response".to_string(),
    })
}
