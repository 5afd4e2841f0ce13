//! Gateway facade.
//!
//! The only type callers need: it owns the provider set, the cache and the
//! fallback order, and turns caller messages into a response or an event
//! stream.

use crate::router::FallbackRouter;
use gateway_config::{CacheBackendKind, CacheConfig, GatewayConfig};
use gateway_core::{
    AggregateFailure, ChatMessage, EventStream, GatewayRequest, GatewayResponse, GenerateOptions,
    LLMProvider, ProviderError, TokenPricing, ValidationError,
};
use gateway_providers::ProviderRegistry;
use gateway_resilience::{CacheStats, RedisCacheBackend, ResponseCache, TimeoutConfig};
use gateway_telemetry::{UsageSnapshot, UsageTracker};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Gateway error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The caller's request was rejected before routing
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// Every attempted provider failed
    #[error(transparent)]
    AllProvidersFailed(#[from] AggregateFailure),

    /// A provider client could not be built
    #[error("failed to initialise provider: {0}")]
    Setup(#[from] ProviderError),
}

/// Result of `Gateway::generate_response`
pub enum GatewayOutput {
    /// Complete response
    Complete(GatewayResponse),
    /// Incremental events ending in `Finalized` or `Error`
    Stream(EventStream),
}

impl GatewayOutput {
    /// The response, if this is not a stream
    #[must_use]
    pub fn into_response(self) -> Option<GatewayResponse> {
        match self {
            Self::Complete(response) => Some(response),
            Self::Stream(_) => None,
        }
    }

    /// The event stream, if this is a stream
    #[must_use]
    pub fn into_stream(self) -> Option<EventStream> {
        match self {
            Self::Complete(_) => None,
            Self::Stream(events) => Some(events),
        }
    }
}

impl std::fmt::Debug for GatewayOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(response) => f.debug_tuple("Complete").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Public view of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    /// Provider ID
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Model identifier
    pub model: String,
    /// Per-1K token pricing
    pub pricing: TokenPricing,
    /// Credentials present
    pub is_available: bool,
    /// Both rates are zero
    pub is_free: bool,
}

impl ProviderInfo {
    fn of(provider: &dyn LLMProvider) -> Self {
        let descriptor = provider.descriptor();
        Self {
            name: descriptor.name.clone(),
            display_name: descriptor.display_name.clone(),
            model: descriptor.model.clone(),
            pricing: descriptor.pricing(),
            is_available: descriptor.is_available,
            is_free: descriptor.is_free(),
        }
    }
}

/// Multi-provider gateway
#[derive(Debug, Clone)]
pub struct Gateway {
    router: FallbackRouter,
}

impl Gateway {
    /// Create a gateway over an explicit provider set
    #[must_use]
    pub fn new(registry: ProviderRegistry, fallback_order: Vec<String>) -> Self {
        Self::from_router(FallbackRouter::new(Arc::new(registry), fallback_order))
    }

    /// Create a gateway around a configured router
    #[must_use]
    pub fn from_router(router: FallbackRouter) -> Self {
        Self { router }
    }

    /// Build providers, cache and timeouts from configuration
    ///
    /// Missing credentials only mark providers unavailable. An unreachable
    /// Redis falls back to the in-memory cache.
    ///
    /// # Errors
    /// Returns error if a provider HTTP client cannot be created
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let registry = ProviderRegistry::from_config(config)?;
        let cache = build_cache(&config.cache).await;

        let mut timeouts = TimeoutConfig::new(config.routing.attempt_timeout)
            .with_stream_idle_timeout(config.routing.stream_idle_timeout);
        if let Some(request_timeout) = config.routing.request_timeout {
            timeouts = timeouts.with_request_timeout(request_timeout);
        }

        let router = FallbackRouter::new(Arc::new(registry), config.effective_fallback_order())
            .with_cache(cache)
            .with_timeouts(timeouts)
            .with_usage_tracker(Arc::new(UsageTracker::new()));

        info!(
            fallback_order = ?router.fallback_order(),
            cache = %router.cache().stats().backend,
            "Gateway initialised"
        );
        Ok(Self::from_router(router))
    }

    /// Generate a response for `messages`
    ///
    /// # Errors
    /// Returns error if the options are invalid or every provider failed
    pub async fn generate_response(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerateOptions,
    ) -> Result<GatewayOutput, GatewayError> {
        let request = GatewayRequest::from_options(messages, options)?;
        if request.stream {
            Ok(GatewayOutput::Stream(self.stream(&request).await?))
        } else {
            Ok(GatewayOutput::Complete(self.complete(&request).await?))
        }
    }

    /// Produce a complete response, using the cache when the request allows
    ///
    /// # Errors
    /// Returns every attempted provider and its error when none succeeded
    pub async fn complete(&self, request: &GatewayRequest) -> Result<GatewayResponse, AggregateFailure> {
        self.router.route(request).await
    }

    /// Stream a response; the cache is never consulted
    ///
    /// # Errors
    /// Returns every attempted provider and its error when no stream opened
    pub async fn stream(&self, request: &GatewayRequest) -> Result<EventStream, AggregateFailure> {
        self.router.route_stream(request).await
    }

    /// Every configured provider, in registration order
    #[must_use]
    pub fn available_providers(&self) -> Vec<ProviderInfo> {
        self.router
            .registry()
            .iter()
            .map(|p| ProviderInfo::of(p.as_ref()))
            .collect()
    }

    /// Configured fallback order
    #[must_use]
    pub fn fallback_order(&self) -> &[String] {
        self.router.fallback_order()
    }

    /// Cheapest available provider: free ones first, then lowest combined rate
    #[must_use]
    pub fn cheapest_provider(&self) -> Option<ProviderInfo> {
        self.router
            .registry()
            .available()
            .map(|p| ProviderInfo::of(p.as_ref()))
            .min_by(|a, b| {
                b.is_free
                    .cmp(&a.is_free)
                    .then_with(|| a.pricing.combined().total_cmp(&b.pricing.combined()))
            })
    }

    /// Usage statistics since start-up
    #[must_use]
    pub fn usage_stats(&self) -> UsageSnapshot {
        self.router.usage().snapshot()
    }

    /// Response cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.router.cache().stats()
    }
}

async fn build_cache(config: &CacheConfig) -> ResponseCache {
    if !config.enabled {
        return ResponseCache::disabled();
    }

    match (config.backend, config.redis_url.as_deref()) {
        (CacheBackendKind::Redis, Some(url)) => {
            match RedisCacheBackend::connect(url, config.key_prefix.clone(), config.operation_timeout).await {
                Ok(backend) => return ResponseCache::new(Arc::new(backend), config.ttl),
                Err(e) => warn!(error = %e, "Redis cache unavailable, using in-memory cache"),
            }
        }
        (CacheBackendKind::Redis, None) => {
            warn!("Redis cache selected without a URL, using in-memory cache");
        }
        (CacheBackendKind::Memory, _) => {}
    }

    ResponseCache::in_memory(config.max_entries, config.ttl)
}
