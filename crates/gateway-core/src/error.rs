//! Error types for the gateway.
//!
//! `ProviderError` is the per-attempt failure the router falls through on.
//! `AggregateFailure` is the only error that leaves the gateway: it lists every
//! attempted provider and why it failed.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single provider attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, DNS, reset)
    #[error("request to {provider} failed: {message}")]
    Network {
        /// Provider ID
        provider: String,
        /// Error message
        message: String,
    },

    /// The attempt exceeded its time budget
    #[error("{provider} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Provider ID
        provider: String,
        /// Budget that elapsed
        timeout: Duration,
    },

    /// Credentials were rejected
    #[error("{provider} rejected credentials: {message}")]
    Authentication {
        /// Provider ID
        provider: String,
        /// Error message
        message: String,
    },

    /// Vendor rate limit hit
    #[error("{provider} rate limited the request: {message}")]
    RateLimited {
        /// Provider ID
        provider: String,
        /// Error message
        message: String,
        /// Vendor retry hint
        retry_after: Option<Duration>,
    },

    /// Vendor answered with a non-success status
    #[error("{provider} returned HTTP {status}: {message}")]
    Vendor {
        /// Provider ID
        provider: String,
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Vendor payload could not be understood
    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse {
        /// Provider ID
        provider: String,
        /// Error message
        message: String,
    },

    /// Operation not supported by this provider
    #[error("{provider} does not support {feature}")]
    Unsupported {
        /// Provider ID
        provider: String,
        /// Missing capability
        feature: String,
    },

    /// Stream broke after it was opened
    #[error("{provider} stream failed: {message}")]
    Stream {
        /// Provider ID
        provider: String,
        /// Error message
        message: String,
    },
}

impl ProviderError {
    /// Create a network error
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(provider: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout,
        }
    }

    /// Create an authentication error
    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
            retry_after,
        }
    }

    /// Create a vendor status error
    pub fn vendor(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Vendor {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(provider: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            feature: feature.into(),
        }
    }

    /// Create a mid-stream error
    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Provider that produced this error
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Authentication { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Vendor { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::Unsupported { provider, .. }
            | Self::Stream { provider, .. } => provider,
        }
    }

    /// Short machine-readable error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Authentication { .. } => "authentication",
            Self::RateLimited { .. } => "rate_limited",
            Self::Vendor { .. } => "vendor",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Unsupported { .. } => "unsupported",
            Self::Stream { .. } => "stream",
        }
    }

    /// Whether this looks like a configuration problem rather than an outage
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Unsupported { .. })
    }
}

/// One failed provider attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    /// Provider ID
    pub provider: String,
    /// Why the attempt failed
    pub error: ProviderError,
}

/// Terminal failure: every attempted provider failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFailure {
    /// Failed attempts in attempt order
    pub attempts: Vec<FailedAttempt>,
    /// The request-wide deadline ended the attempt sequence early
    pub deadline_exceeded: bool,
}

impl AggregateFailure {
    /// Create an empty failure
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed attempt
    pub fn record(&mut self, provider: impl Into<String>, error: ProviderError) {
        self.attempts.push(FailedAttempt {
            provider: provider.into(),
            error,
        });
    }

    /// Mark the failure as caused by the request deadline
    #[must_use]
    pub fn with_deadline_exceeded(mut self) -> Self {
        self.deadline_exceeded = true;
        self
    }

    /// True when no provider was attempted at all
    #[must_use]
    pub fn no_providers_attempted(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Attempted provider IDs, in order
    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.provider.as_str()).collect()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            f.write_str("no LLM providers available")?;
        } else {
            write!(f, "all {} LLM providers failed", self.attempts.len())?;
            for attempt in &self.attempts {
                write!(f, "; {}: {}", attempt.provider, attempt.error)?;
            }
        }
        if self.deadline_exceeded {
            f.write_str(" (request deadline exceeded)")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}

/// Invalid request construction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// No messages supplied
    #[error("messages cannot be empty")]
    EmptyMessages,
    /// Temperature out of range
    #[error("temperature must be between 0.0 and 2.0, got {0}")]
    Temperature(f32),
    /// max_tokens must be positive
    #[error("max_tokens must be greater than zero")]
    MaxTokens,
}
