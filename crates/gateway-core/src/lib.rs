//! # Gateway Core
//!
//! Core types, traits, and error handling for the LLM fallback gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Normalized request and response types
//! - The `LLMProvider` capability trait and provider descriptors
//! - Streaming event types
//! - Provider and aggregate error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod provider;
pub mod request;
pub mod response;
pub mod streaming;

// Re-export commonly used types
pub use error::{AggregateFailure, FailedAttempt, ProviderError, ValidationError};
pub use provider::{FragmentStream, LLMProvider, ProviderDescriptor, StreamFragment, TokenPricing};
pub use request::{
    ChatMessage, GatewayRequest, GatewayRequestBuilder, GenerateOptions, MessageRole,
    ResponseFormat, DEFAULT_TEMPERATURE,
};
pub use response::{Completion, GatewayResponse, Usage};
pub use streaming::{EventStream, StreamEvent, StreamSummary};
