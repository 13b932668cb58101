//! Feature-level token ceilings
//!
//! Static map from feature tag to the maximum number of output tokens a
//! single call for that feature may request.

/// Ceiling applied to features with no explicit entry
pub const DEFAULT_FEATURE_TOKEN_CEILING: u64 = 8_192;

const FEATURE_CEILINGS: &[(&str, u64)] = &[
    ("research-discovery", 16_384),
    ("research-synthesis", 32_768),
    ("plan", 8_192),
    ("critique", 4_096),
    ("scorecard", 2_048),
];

/// Max tokens a single call for this feature may request
pub fn feature_token_ceiling(feature: &str) -> u64 {
    FEATURE_CEILINGS
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(_, ceiling)| *ceiling)
        .unwrap_or(DEFAULT_FEATURE_TOKEN_CEILING)
}
