//! Loading configuration from files and the environment.

use crate::error::{ConfigError, Result};
use crate::provider::ProviderKind;
use crate::settings::LogFormat;
use crate::GatewayConfig;
use humantime_serde::re::humantime;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Load configuration from the process environment
///
/// Reads the file named by `GATEWAY_CONFIG` if set, otherwise starts from the
/// built-in defaults. Environment overrides are applied and the result is
/// validated.
pub fn load_config() -> Result<GatewayConfig> {
    load_config_with(&|name| std::env::var(name).ok())
}

/// Load configuration with an explicit variable lookup
pub fn load_config_with<F>(lookup: &F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup("GATEWAY_CONFIG").filter(|p| !p.trim().is_empty()) {
        Some(path) => load_from_path(path)?,
        None => {
            debug!("No GATEWAY_CONFIG set, using built-in provider defaults");
            let mut config = GatewayConfig::default();
            if lookup("OLLAMA_BASE_URL").is_some() {
                for provider in &mut config.providers {
                    if provider.kind == ProviderKind::Ollama {
                        provider.enabled = true;
                    }
                }
            }
            config
        }
    };

    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    Ok(config)
}

/// Parse a YAML or TOML file, chosen by extension
pub fn load_from_path(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let config: GatewayConfig = match extension.as_str() {
        "yaml" | "yml" => {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        }
        "toml" => toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };

    info!(path = %path.display(), "Loaded gateway configuration");
    Ok(config)
}

/// Apply `GATEWAY_*` overrides
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(order) = lookup("GATEWAY_FALLBACK_ORDER") {
        config.routing.fallback_order = order
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(value) = lookup("GATEWAY_ATTEMPT_TIMEOUT") {
        config.routing.attempt_timeout = parse_duration("GATEWAY_ATTEMPT_TIMEOUT", &value)?;
    }

    if let Some(value) = lookup("GATEWAY_REQUEST_TIMEOUT") {
        config.routing.request_timeout = Some(parse_duration("GATEWAY_REQUEST_TIMEOUT", &value)?);
    }

    if let Some(value) = lookup("GATEWAY_CACHE_TTL") {
        config.cache.ttl = parse_duration("GATEWAY_CACHE_TTL", &value)?;
    }

    if let Some(url) = lookup("GATEWAY_REDIS_URL") {
        config.cache.backend = crate::CacheBackendKind::Redis;
        config.cache.redis_url = Some(url);
    }

    if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::invalid_env("GATEWAY_LOG_FORMAT", e))?;
    }

    Ok(())
}

fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ConfigError::invalid_env(name, format!("'{value}': {e}")))
}
