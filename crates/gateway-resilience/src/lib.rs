//! # Gateway Resilience
//!
//! Resilience patterns for the LLM fallback gateway:
//! - Per-attempt and per-request timeout budgets
//! - Response caching over in-memory or Redis backends

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod timeout;

// Re-export main types
pub use cache::{
    CacheBackend, CacheError, CacheResult, CacheStats, CachedEntry, MemoryCacheBackend,
    RedisCacheBackend, ResponseCache,
};
pub use timeout::{RequestBudget, TimeoutConfig};
