//! # Gateway Providers
//!
//! LLM provider implementations for the fallback gateway:
//! - OpenAI-compatible chat completions (OpenAI, OpenRouter, Groq)
//! - Azure OpenAI deployments
//! - Google Gemini
//! - Ollama (self-hosted)
//!
//! `ProviderRegistry` builds the configured set from `gateway-config`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod framing;
mod http;

pub mod azure;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod registry;

// Re-export main types
pub use azure::{AzureOpenAIConfig, AzureOpenAIProvider};
pub use google::{GeminiConfig, GeminiProvider};
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use registry::{build_provider, descriptor_for, ProviderRegistry};
