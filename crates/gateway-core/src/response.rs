//! Response types for the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token usage for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Sum of prompt and completion tokens
    pub total_tokens: u32,
    /// Counts are a heuristic estimate, not vendor-reported
    #[serde(default)]
    pub estimated: bool,
}

impl Usage {
    /// Exact usage as reported by a vendor
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            estimated: false,
        }
    }

    /// Usage derived from a heuristic
    #[must_use]
    pub fn estimated(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            estimated: true,
            ..Self::new(prompt_tokens, completion_tokens)
        }
    }

    /// Whether no token counts are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }
}

/// Raw completion returned by a provider, before cost accounting
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated text
    pub content: String,
    /// Model that produced the text, as reported by the vendor
    pub model: String,
    /// Vendor-reported usage, if any
    pub usage: Option<Usage>,
}

impl Completion {
    /// Create a completion
    #[must_use]
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
        }
    }

    /// Attach usage
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Final gateway response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Generated text
    pub content: String,
    /// Descriptor name of the provider that produced the text
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Token usage
    pub usage: Usage,
    /// Monetary cost, in the unit of the descriptor pricing
    pub cost: f64,
    /// Wall-clock duration of the successful attempt
    pub duration_seconds: f64,
    /// Completion time
    pub timestamp: DateTime<Utc>,
    /// Served from the response cache
    #[serde(default)]
    pub cached: bool,
}
