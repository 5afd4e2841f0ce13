//! # Gateway Telemetry
//!
//! Observability and accounting for the LLM fallback gateway.
//!
//! This crate provides:
//! - Structured logging setup
//! - Cost computation from token usage
//! - In-memory usage statistics per provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cost;
pub mod logging;
pub mod usage;

// Re-export main types
pub use cost::{CostAccountant, CostError, CHARS_PER_TOKEN};
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use usage::{ProviderUsage, UsageSnapshot, UsageTracker};
