//! Provider registry.
//!
//! Builds one provider per configured entry and keeps them in declaration
//! order. The set is immutable once built and shared behind `Arc`.

use crate::azure::{AzureOpenAIConfig, AzureOpenAIProvider};
use crate::google::{GeminiConfig, GeminiProvider};
use crate::ollama::{OllamaConfig, OllamaProvider};
use crate::openai::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use gateway_config::{GatewayConfig, ProviderConfig, ProviderKind};
use gateway_core::{LLMProvider, ProviderDescriptor, ProviderError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Ordered, immutable provider set
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LLMProvider>>,
    index: HashMap<String, usize>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured provider, reading credentials from the process environment
    ///
    /// # Errors
    /// Returns error if an HTTP client cannot be created
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ProviderError> {
        Self::from_config_with(config, &|name| std::env::var(name).ok())
    }

    /// Build every configured provider with an explicit variable lookup
    ///
    /// Missing credentials mark a provider unavailable; they never fail the build.
    ///
    /// # Errors
    /// Returns error if an HTTP client cannot be created
    pub fn from_config_with<F>(config: &GatewayConfig, lookup: &F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::new();
        for provider_config in &config.providers {
            let provider = build_provider(provider_config, lookup)?;
            debug!(
                provider = %provider.id(),
                kind = %provider_config.kind,
                model = %provider.model(),
                available = provider.is_available(),
                "Provider registered"
            );
            registry.register(provider);
        }

        info!(
            total = registry.len(),
            available = registry.available().count(),
            "Provider registry built"
        );
        Ok(registry)
    }

    /// Add a provider; a provider with the same ID is replaced in place
    pub fn register(&mut self, provider: Arc<dyn LLMProvider>) {
        let id = provider.id().to_string();
        if let Some(&position) = self.index.get(&id) {
            self.providers[position] = provider;
        } else {
            self.index.insert(id, self.providers.len());
            self.providers.push(provider);
        }
    }

    /// Builder-style `register`
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Look up a provider by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn LLMProvider>> {
        self.index.get(id).map(|&i| Arc::clone(&self.providers[i]))
    }

    /// Whether a provider with this ID exists
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All providers, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LLMProvider>> {
        self.providers.iter()
    }

    /// Providers whose credentials are present
    pub fn available(&self) -> impl Iterator<Item = &Arc<dyn LLMProvider>> {
        self.providers.iter().filter(|p| p.is_available())
    }

    /// Provider IDs, in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    /// Number of providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

/// Descriptor for a configured provider
pub fn descriptor_for<F>(config: &ProviderConfig, lookup: &F) -> ProviderDescriptor
where
    F: Fn(&str) -> Option<String>,
{
    ProviderDescriptor::new(&config.id, &config.model)
        .with_display_name(config.display_name())
        .with_pricing(config.input_cost_per_1k, config.output_cost_per_1k)
        .with_availability(config.is_available_with(lookup))
}

/// Build the provider for one configuration entry
///
/// # Errors
/// Returns error if the HTTP client cannot be created
pub fn build_provider<F>(
    config: &ProviderConfig,
    lookup: &F,
) -> Result<Arc<dyn LLMProvider>, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    let descriptor = descriptor_for(config, lookup);
    let api_key = config.resolve_api_key_with(lookup);
    // Only Azure lacks a default; an unavailable descriptor keeps it out of rotation
    let base_url = config.resolve_base_url_with(lookup).unwrap_or_default();

    let provider: Arc<dyn LLMProvider> = match config.kind {
        ProviderKind::OpenAI | ProviderKind::OpenRouter | ProviderKind::Groq => {
            let mut openai = OpenAICompatibleConfig::new(descriptor, base_url)
                // Groq rejects stream_options
                .with_stream_usage(config.kind != ProviderKind::Groq);
            if let Some(key) = api_key {
                openai = openai.with_api_key(key);
            }
            if let Some(site_url) = &config.site_url {
                openai = openai.with_header("HTTP-Referer", site_url);
            }
            if let Some(app_name) = &config.app_name {
                openai = openai.with_header("X-Title", app_name);
            }
            Arc::new(OpenAICompatibleProvider::new(openai)?)
        }
        ProviderKind::AzureOpenAI => {
            let mut azure = AzureOpenAIConfig::new(descriptor, base_url)
                .with_api_version(config.resolve_api_version_with(lookup));
            if let Some(key) = api_key {
                azure = azure.with_api_key(key);
            }
            Arc::new(AzureOpenAIProvider::new(azure)?)
        }
        ProviderKind::GoogleGemini => {
            let mut gemini = GeminiConfig::new(descriptor, base_url);
            if let Some(key) = api_key {
                gemini = gemini.with_api_key(key);
            }
            Arc::new(GeminiProvider::new(gemini)?)
        }
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(OllamaConfig::new(descriptor, base_url))?),
    };

    Ok(provider)
}
