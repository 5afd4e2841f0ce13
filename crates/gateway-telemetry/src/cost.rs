//! Cost computation for LLM usage.
//!
//! Costs are computed from per-1K token pricing. Streaming responses without
//! vendor usage use a character-count estimate and are flagged `estimated`.

use gateway_core::{ProviderDescriptor, TokenPricing, Usage};
use thiserror::Error;
use tracing::warn;

/// Characters per token used by the streaming estimate
pub const CHARS_PER_TOKEN: usize = 4;

/// Cost could not be computed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CostError {
    /// Pricing produced NaN or infinity
    #[error("cost is not a finite number (input rate {input_per_1k}, output rate {output_per_1k})")]
    NonFinite {
        /// Input rate
        input_per_1k: f64,
        /// Output rate
        output_per_1k: f64,
    },
    /// Pricing produced a negative cost
    #[error("cost is negative: {0}")]
    Negative(f64),
}

/// Pure cost computations
#[derive(Debug, Clone, Copy, Default)]
pub struct CostAccountant;

impl CostAccountant {
    /// Compute the cost of `usage` under `pricing`
    ///
    /// # Errors
    /// Returns error if the pricing yields a non-finite or negative amount
    pub fn compute(pricing: &TokenPricing, usage: &Usage) -> Result<f64, CostError> {
        if pricing.is_free() {
            return Ok(0.0);
        }

        let weighted = f64::from(usage.prompt_tokens) * pricing.input_per_1k
            + f64::from(usage.completion_tokens) * pricing.output_per_1k;
        let cost = weighted / 1000.0;

        if !cost.is_finite() {
            return Err(CostError::NonFinite {
                input_per_1k: pricing.input_per_1k,
                output_per_1k: pricing.output_per_1k,
            });
        }
        if cost < 0.0 {
            return Err(CostError::Negative(cost));
        }

        Ok(cost)
    }

    /// Compute the cost for a provider, defaulting to zero on failure
    #[must_use]
    pub fn cost_or_zero(descriptor: &ProviderDescriptor, usage: &Usage) -> f64 {
        match Self::compute(&descriptor.pricing(), usage) {
            Ok(cost) => cost,
            Err(e) => {
                warn!(
                    provider = %descriptor.name,
                    error = %e,
                    "Cost computation failed, reporting zero"
                );
                0.0
            }
        }
    }

    /// Estimate tokens from a character count
    #[must_use]
    pub fn estimate_tokens(chars: usize) -> u32 {
        let tokens = chars.div_ceil(CHARS_PER_TOKEN);
        u32::try_from(tokens).unwrap_or(u32::MAX)
    }

    /// Estimated usage from prompt and completion character counts
    #[must_use]
    pub fn estimate_usage(prompt_chars: usize, completion_chars: usize) -> Usage {
        Usage::estimated(
            Self::estimate_tokens(prompt_chars),
            Self::estimate_tokens(completion_chars),
        )
    }
}
