//! Fallback router.
//!
//! Tries providers one at a time in a deterministic order until one answers.
//! Every failed attempt is recorded; when nothing succeeds the caller gets
//! the full list back as an `AggregateFailure`.

use crate::stream::StreamAggregator;
use chrono::Utc;
use gateway_core::{
    AggregateFailure, EventStream, GatewayRequest, GatewayResponse, LLMProvider, ProviderError,
};
use gateway_providers::ProviderRegistry;
use gateway_resilience::{RequestBudget, ResponseCache, TimeoutConfig};
use gateway_telemetry::{CostAccountant, UsageTracker};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Ordered fallback across a fixed provider set
#[derive(Debug, Clone)]
pub struct FallbackRouter {
    registry: Arc<ProviderRegistry>,
    fallback_order: Vec<String>,
    cache: ResponseCache,
    timeouts: TimeoutConfig,
    usage: Arc<UsageTracker>,
}

impl FallbackRouter {
    /// Create a router; `fallback_order` entries not in `registry` are ignored
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, fallback_order: Vec<String>) -> Self {
        Self {
            registry,
            fallback_order,
            cache: ResponseCache::disabled(),
            timeouts: TimeoutConfig::default(),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    /// Set the response cache
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    /// Set the timeouts
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Share a usage tracker
    #[must_use]
    pub fn with_usage_tracker(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    /// Provider set
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Configured fallback order
    #[must_use]
    pub fn fallback_order(&self) -> &[String] {
        &self.fallback_order
    }

    /// Response cache
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Usage tracker
    #[must_use]
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Providers to try for a request, in order
    ///
    /// The preferred provider goes first when it is known; the fallback order
    /// follows without duplicates. Unavailable providers are left out.
    #[must_use]
    pub fn attempt_order(&self, preferred: Option<&str>) -> Vec<Arc<dyn LLMProvider>> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.fallback_order.len() + 1);

        if let Some(preferred) = preferred {
            if self.registry.contains(preferred) {
                ids.push(preferred);
            } else {
                warn!(provider = %preferred, "Unknown preferred provider, using fallback order");
            }
        }
        ids.extend(self.fallback_order.iter().map(String::as_str));

        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.registry.get(id))
            .filter(|provider| {
                let available = provider.is_available();
                if !available {
                    debug!(provider = %provider.id(), "Skipping unavailable provider");
                }
                available
            })
            .collect()
    }

    /// Produce a complete response
    ///
    /// # Errors
    /// Returns every attempted provider and its error when none succeeded
    pub async fn route(&self, request: &GatewayRequest) -> Result<GatewayResponse, AggregateFailure> {
        let candidates = self.attempt_order(request.preferred_provider.as_deref());
        let use_cache = request.is_cacheable() && self.cache.is_enabled();

        if use_cache {
            if let Some(response) = self.cached_response(request, &candidates).await {
                return Ok(response);
            }
        }

        let budget = self.timeouts.start();
        let mut failure = AggregateFailure::new();

        for provider in &candidates {
            if budget.is_exhausted() {
                return Err(self.exhausted(request, failure.with_deadline_exceeded()));
            }

            match self.attempt(&budget, provider.as_ref(), request).await {
                Ok(response) => {
                    if use_cache {
                        let key = ResponseCache::key_for(request, provider.model());
                        self.cache.put(&key, &response).await;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        request_id = %request.id,
                        provider = %provider.id(),
                        kind = e.kind(),
                        error = %e,
                        "Provider attempt failed, falling back"
                    );
                    self.usage.record_failure(provider.id());
                    failure.record(provider.id(), e);
                }
            }
        }

        if budget.is_exhausted() {
            failure = failure.with_deadline_exceeded();
        }
        Err(self.exhausted(request, failure))
    }

    /// Open a stream with the first provider that accepts the request
    ///
    /// Only opening falls through; once a stream is handed out, its failures
    /// are reported as an `Error` event.
    ///
    /// # Errors
    /// Returns every attempted provider and its error when no stream opened
    pub async fn route_stream(&self, request: &GatewayRequest) -> Result<EventStream, AggregateFailure> {
        let candidates = self.attempt_order(request.preferred_provider.as_deref());
        let budget = self.timeouts.start();
        let mut failure = AggregateFailure::new();

        for provider in &candidates {
            if budget.is_exhausted() {
                return Err(self.exhausted(request, failure.with_deadline_exceeded()));
            }

            let opened = if provider.supports_streaming() {
                budget.run(provider.id(), provider.stream(request)).await
            } else {
                Err(ProviderError::unsupported(provider.id(), "streaming"))
            };

            match opened {
                Ok(fragments) => {
                    info!(
                        request_id = %request.id,
                        provider = %provider.id(),
                        model = %provider.model(),
                        "Stream opened"
                    );
                    let aggregator = StreamAggregator::new(
                        provider.descriptor().clone(),
                        request.prompt_chars(),
                        self.timeouts.stream_idle_timeout,
                    )
                    .with_usage_tracker(Arc::clone(&self.usage));
                    return Ok(aggregator.aggregate(fragments));
                }
                Err(e) => {
                    warn!(
                        request_id = %request.id,
                        provider = %provider.id(),
                        kind = e.kind(),
                        error = %e,
                        "Failed to open stream, falling back"
                    );
                    self.usage.record_failure(provider.id());
                    failure.record(provider.id(), e);
                }
            }
        }

        if budget.is_exhausted() {
            failure = failure.with_deadline_exceeded();
        }
        Err(self.exhausted(request, failure))
    }

    async fn cached_response(
        &self,
        request: &GatewayRequest,
        candidates: &[Arc<dyn LLMProvider>],
    ) -> Option<GatewayResponse> {
        let keys: Vec<String> = candidates
            .iter()
            .map(|provider| ResponseCache::key_for(request, provider.model()))
            .collect();
        if let Some(response) = self.cache.get_first(&keys).await {
            info!(
                request_id = %request.id,
                provider = %response.provider,
                model = %response.model,
                "Serving cached response"
            );
            self.usage.record_cache_hit();
            return Some(response);
        }
        self.usage.record_cache_miss();
        None
    }

    async fn attempt(
        &self,
        budget: &RequestBudget,
        provider: &dyn LLMProvider,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, ProviderError> {
        debug!(request_id = %request.id, provider = %provider.id(), "Attempting provider");

        let started = Instant::now();
        let completion = budget.run(provider.id(), provider.generate(request)).await?;
        let duration = started.elapsed();

        let usage = completion.usage.unwrap_or_else(|| {
            CostAccountant::estimate_usage(request.prompt_chars(), completion.content.chars().count())
        });
        let cost = CostAccountant::cost_or_zero(provider.descriptor(), &usage);

        info!(
            request_id = %request.id,
            provider = %provider.id(),
            model = %completion.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            estimated = usage.estimated,
            cost,
            duration_ms = duration.as_millis(),
            "Provider attempt succeeded"
        );
        self.usage.record_success(provider.id(), &usage, cost);

        Ok(GatewayResponse {
            content: completion.content,
            provider: provider.id().to_string(),
            model: completion.model,
            usage,
            cost,
            duration_seconds: duration.as_secs_f64(),
            timestamp: Utc::now(),
            cached: false,
        })
    }

    fn exhausted(&self, request: &GatewayRequest, failure: AggregateFailure) -> AggregateFailure {
        if failure.no_providers_attempted() {
            warn!(request_id = %request.id, "No available providers");
        } else {
            warn!(
                request_id = %request.id,
                attempts = failure.attempts.len(),
                deadline_exceeded = failure.deadline_exceeded,
                "All providers failed"
            );
        }
        failure
    }
}
