//! Integration tests for the LLM fallback gateway
//!
//! Every test drives a real `Gateway` built from configuration against
//! wiremock vendors:
//! - Ordered fallback across vendors
//! - Streaming aggregation
//! - Response caching

pub mod fixtures;
pub mod mock_providers;

pub use fixtures::*;
pub use mock_providers::*;

#[cfg(test)]
mod cache_tests;
#[cfg(test)]
mod fallback_tests;
#[cfg(test)]
mod streaming_tests;
