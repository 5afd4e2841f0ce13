//! # Gateway Routing
//!
//! Fallback routing for the LLM gateway.
//!
//! This crate provides:
//! - `FallbackRouter`: ordered attempts with cache probing and cost accounting
//! - `StreamAggregator`: provider fragments to chunk and terminal events
//! - `Gateway`: the caller-facing facade

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gateway;
pub mod router;
pub mod stream;

#[cfg(test)]
mod fake;

// Re-export main types
pub use gateway::{Gateway, GatewayError, GatewayOutput, ProviderInfo};
pub use router::FallbackRouter;
pub use stream::StreamAggregator;
