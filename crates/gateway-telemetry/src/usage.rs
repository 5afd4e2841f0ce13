//! In-memory usage statistics.
//!
//! Counts requests, tokens and cost per provider, plus cache hit rate. The
//! tracker is process-local; it resets when the gateway restarts.

use gateway_core::Usage;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderUsage {
    /// Successful requests
    pub requests: u64,
    /// Failed attempts
    pub failures: u64,
    /// Prompt tokens consumed
    pub prompt_tokens: u64,
    /// Completion tokens produced
    pub completion_tokens: u64,
    /// Accumulated cost
    pub cost: f64,
    /// Requests whose usage was estimated
    pub estimated_requests: u64,
}

impl ProviderUsage {
    /// Total tokens
    #[must_use]
    pub fn tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Point-in-time copy of the statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSnapshot {
    /// Successful provider requests
    pub total_requests: u64,
    /// Tokens across all providers
    pub total_tokens: u64,
    /// Cost across all providers
    pub total_cost: f64,
    /// Per-provider counters, sorted by provider ID
    pub providers_used: BTreeMap<String, ProviderUsage>,
    /// Mean cost of a successful provider request
    pub average_cost_per_request: f64,
    /// Cache hits
    pub cache_hits: u64,
    /// Cache misses
    pub cache_misses: u64,
    /// Hits over lookups, zero when nothing was looked up
    pub cache_hit_rate: f64,
}

/// Thread-safe usage tracker
#[derive(Debug, Default)]
pub struct UsageTracker {
    providers: RwLock<HashMap<String, ProviderUsage>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl UsageTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful request
    pub fn record_success(&self, provider: &str, usage: &Usage, cost: f64) {
        let mut providers = self.providers.write();
        let entry = providers.entry(provider.to_string()).or_default();
        entry.requests += 1;
        entry.prompt_tokens += u64::from(usage.prompt_tokens);
        entry.completion_tokens += u64::from(usage.completion_tokens);
        entry.cost += cost;
        if usage.estimated {
            entry.estimated_requests += 1;
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&self, provider: &str) {
        self.providers
            .write()
            .entry(provider.to_string())
            .or_default()
            .failures += 1;
    }

    /// Record a cache hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot
    #[must_use]
    pub fn snapshot(&self) -> UsageSnapshot {
        let providers_used: BTreeMap<String, ProviderUsage> = self
            .providers
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let total_requests: u64 = providers_used.values().map(|p| p.requests).sum();
        let total_tokens: u64 = providers_used.values().map(ProviderUsage::tokens).sum();
        let total_cost: f64 = providers_used.values().map(|p| p.cost).sum();
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;

        UsageSnapshot {
            total_requests,
            total_tokens,
            total_cost,
            providers_used,
            average_cost_per_request: if total_requests == 0 {
                0.0
            } else {
                total_cost / total_requests as f64
            },
            cache_hits,
            cache_misses,
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
        }
    }
}
