//! Model pricing table
//!
//! Static map from model name to per-million-token prices, used to turn
//! provider token counts into recorded USD cost.

/// Per-million-token prices for one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

const PRICING: &[(&str, ModelPricing)] = &[
    (
        "claude-opus-4-1",
        ModelPricing {
            input_per_mtok: 15.0,
            output_per_mtok: 75.0,
        },
    ),
    (
        "claude-sonnet-4-5",
        ModelPricing {
            input_per_mtok: 3.0,
            output_per_mtok: 15.0,
        },
    ),
    (
        "claude-haiku-4-5",
        ModelPricing {
            input_per_mtok: 1.0,
            output_per_mtok: 5.0,
        },
    ),
];

/// Look up pricing for a model.
///
/// Unknown models fall back to the most expensive known rate so cost is
/// never undercounted.
pub fn pricing_for(model: &str) -> ModelPricing {
    PRICING
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, p)| *p)
        .unwrap_or_else(|| {
            PRICING
                .iter()
                .map(|(_, p)| *p)
                .fold(
                    ModelPricing {
                        input_per_mtok: 0.0,
                        output_per_mtok: 0.0,
                    },
                    |acc, p| {
                        if p.input_per_mtok + p.output_per_mtok
                            > acc.input_per_mtok + acc.output_per_mtok
                        {
                            p
                        } else {
                            acc
                        }
                    },
                )
        })
}

/// Compute USD cost for a completed call
pub fn cost_usd(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let pricing = pricing_for(model);
    (input_tokens as f64 * pricing.input_per_mtok
        + output_tokens as f64 * pricing.output_per_mtok)
        / 1_000_000.0
}
