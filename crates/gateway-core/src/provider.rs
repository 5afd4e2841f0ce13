//! Provider trait and descriptor types.

use crate::error::ProviderError;
use crate::request::GatewayRequest;
use crate::response::{Completion, Usage};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Static metadata for one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider ID used in fallback lists and responses
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Vendor model identifier
    pub model: String,
    /// Cost per 1K prompt tokens
    pub cost_per_1k_input: f64,
    /// Cost per 1K completion tokens
    pub cost_per_1k_output: f64,
    /// Required credentials were present at construction
    pub is_available: bool,
}

impl ProviderDescriptor {
    /// Create a free, available descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            model: model.into(),
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
            is_available: true,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set per-1K pricing
    #[must_use]
    pub fn with_pricing(mut self, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.cost_per_1k_input = input_per_1k;
        self.cost_per_1k_output = output_per_1k;
        self
    }

    /// Set availability
    #[must_use]
    pub fn with_availability(mut self, is_available: bool) -> Self {
        self.is_available = is_available;
        self
    }

    /// Pricing view of this descriptor
    #[must_use]
    pub fn pricing(&self) -> TokenPricing {
        TokenPricing {
            input_per_1k: self.cost_per_1k_input,
            output_per_1k: self.cost_per_1k_output,
        }
    }

    /// Both rates are zero
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.pricing().is_free()
    }
}

/// Per-1K token pricing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPricing {
    /// Cost per 1K prompt tokens
    pub input_per_1k: f64,
    /// Cost per 1K completion tokens
    pub output_per_1k: f64,
}

impl TokenPricing {
    /// Both rates are zero
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.input_per_1k == 0.0 && self.output_per_1k == 0.0
    }

    /// Combined rate used to rank providers by price
    #[must_use]
    pub fn combined(&self) -> f64 {
        self.input_per_1k + self.output_per_1k
    }
}

/// One incremental item from a provider stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFragment {
    /// Text delta
    Delta(String),
    /// Vendor-reported usage, usually in the last frame
    Usage(Usage),
}

/// Stream of fragments from one provider call
pub type FragmentStream = BoxStream<'static, Result<StreamFragment, ProviderError>>;

/// A backend that can produce completions
///
/// Implementations must not retry internally: each call maps to exactly one
/// billable vendor request. Fallback and timeouts belong to the router.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Static metadata for this provider
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Provider ID
    fn id(&self) -> &str {
        &self.descriptor().name
    }

    /// Model identifier
    fn model(&self) -> &str {
        &self.descriptor().model
    }

    /// Whether required credentials are present
    fn is_available(&self) -> bool {
        self.descriptor().is_available
    }

    /// Per-1K token pricing
    fn cost_per_token(&self) -> TokenPricing {
        self.descriptor().pricing()
    }

    /// Whether `stream` is implemented
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Produce a full completion
    async fn generate(&self, request: &GatewayRequest) -> Result<Completion, ProviderError>;

    /// Open an incremental completion
    ///
    /// Errors returned here happen before any content was produced.
    async fn stream(&self, request: &GatewayRequest) -> Result<FragmentStream, ProviderError> {
        let _ = request;
        Err(ProviderError::unsupported(self.id(), "streaming"))
    }
}
