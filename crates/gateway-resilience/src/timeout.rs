//! Timeout management for provider attempts.
//!
//! Each attempt gets the per-attempt timeout, capped by whatever is left of
//! the optional request-wide budget.

use gateway_core::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Timeout for a single provider attempt
    pub attempt_timeout: Duration,
    /// Budget for the whole request across attempts
    pub request_timeout: Option<Duration>,
    /// Longest allowed gap between stream fragments
    pub stream_idle_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            request_timeout: None,
            stream_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl TimeoutConfig {
    /// Create a configuration with the given attempt timeout
    #[must_use]
    pub fn new(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Set the request budget
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the stream idle timeout
    #[must_use]
    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    /// Start the clock for one request
    #[must_use]
    pub fn start(&self) -> RequestBudget {
        RequestBudget {
            attempt_timeout: self.attempt_timeout,
            deadline: self.request_timeout.map(|t| Instant::now() + t),
        }
    }
}

/// Time remaining for one gateway request
#[derive(Debug, Clone, Copy)]
pub struct RequestBudget {
    attempt_timeout: Duration,
    deadline: Option<Instant>,
}

impl RequestBudget {
    /// Time left before the request deadline; `None` without a deadline
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// The request deadline has passed
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Timeout for the next attempt
    #[must_use]
    pub fn next_attempt_timeout(&self) -> Duration {
        match self.remaining() {
            Some(remaining) => self.attempt_timeout.min(remaining),
            None => self.attempt_timeout,
        }
    }

    /// Run one provider attempt under the next attempt timeout
    ///
    /// # Errors
    /// Returns the attempt's own error, or `ProviderError::Timeout` if it
    /// did not finish in time
    pub async fn run<T, F>(&self, provider: &str, attempt: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let timeout = self.next_attempt_timeout();
        if let Ok(result) = tokio::time::timeout(timeout, attempt).await {
            result
        } else {
            warn!(
                provider = %provider,
                timeout_ms = timeout.as_millis(),
                "Provider attempt timed out"
            );
            Err(ProviderError::timeout(provider, timeout))
        }
    }
}
