//! Configuration for the LLM fallback gateway.
//!
//! Configuration comes from a YAML or TOML file named by `GATEWAY_CONFIG`, or
//! from built-in vendor defaults when no file is given. `GATEWAY_*` variables
//! override individual settings; API keys are read from the environment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod provider;
pub mod settings;

pub use error::{ConfigError, Result};
pub use loader::{apply_env_overrides, load_config, load_config_with, load_from_path};
pub use provider::{
    builtin_providers, ProviderConfig, ProviderKind, DEFAULT_AZURE_API_VERSION,
    DEFAULT_OLLAMA_BASE_URL,
};
pub use settings::{CacheBackendKind, CacheConfig, LogFormat, LoggingSettings, RoutingConfig};

use serde::Deserialize;
use std::collections::HashSet;
use validator::Validate;

/// Complete gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Configured providers
    #[serde(default = "builtin_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Fallback routing
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: builtin_providers(),
            routing: RoutingConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Provider IDs in attempt order
    ///
    /// Falls back to declaration order when no order is configured.
    #[must_use]
    pub fn effective_fallback_order(&self) -> Vec<String> {
        if self.routing.fallback_order.is_empty() {
            self.providers.iter().map(|p| p.id.clone()).collect()
        } else {
            self.routing.fallback_order.clone()
        }
    }

    /// Look up a provider by ID
    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for provider in &self.providers {
            Validate::validate(provider)
                .map_err(|e| ConfigError::validation(format!("provider '{}': {e}", provider.id)))?;
            if !ids.insert(provider.id.as_str()) {
                return Err(ConfigError::validation(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
            if let Some(url) = &provider.base_url {
                url::Url::parse(url).map_err(|e| {
                    ConfigError::validation(format!(
                        "provider '{}' has invalid base_url: {e}",
                        provider.id
                    ))
                })?;
            }
        }

        let mut seen = HashSet::new();
        for id in &self.routing.fallback_order {
            if !ids.contains(id.as_str()) {
                return Err(ConfigError::validation(format!(
                    "fallback_order references unknown provider '{id}'"
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::validation(format!(
                    "fallback_order lists '{id}' more than once"
                )));
            }
        }

        if self.routing.attempt_timeout.is_zero() {
            return Err(ConfigError::validation("attempt_timeout must be non-zero"));
        }
        if self.routing.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::validation("request_timeout must be non-zero"));
        }

        Validate::validate(&self.cache)?;
        if self.cache.enabled
            && self.cache.backend == CacheBackendKind::Redis
            && self.cache.redis_url.is_none()
        {
            return Err(ConfigError::validation(
                "redis cache backend requires cache.redis_url",
            ));
        }

        Ok(())
    }
}
