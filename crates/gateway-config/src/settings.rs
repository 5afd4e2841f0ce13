//! Routing, cache and logging settings.

use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

/// Fallback routing settings
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Provider IDs in attempt order; empty means declaration order
    #[serde(default)]
    pub fallback_order: Vec<String>,

    /// Timeout for one provider attempt
    #[serde(default = "default_attempt_timeout", with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Overall budget for one gateway request
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    /// Longest allowed gap between stream fragments
    #[serde(default = "default_stream_idle_timeout", with = "humantime_serde")]
    pub stream_idle_timeout: Duration,
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_stream_idle_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fallback_order: Vec::new(),
            attempt_timeout: default_attempt_timeout(),
            request_timeout: None,
            stream_idle_timeout: default_stream_idle_timeout(),
        }
    }
}

/// Cache storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Process-local map
    #[default]
    Memory,
    /// Shared Redis instance
    Redis,
}

/// Response cache settings
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CacheConfig {
    /// Enable the response cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Storage backend
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Entry time-to-live
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// Entry bound for the memory backend
    #[serde(default = "default_max_entries")]
    #[validate(range(min = 1))]
    pub max_entries: usize,

    /// Redis connection URL
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Namespace prepended to every key
    #[serde(default = "default_key_prefix")]
    #[validate(length(max = 128))]
    pub key_prefix: String,

    /// Timeout for one backend operation
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_max_entries() -> usize {
    1000
}

fn default_key_prefix() -> String {
    "llm_gateway:".to_string()
}

fn default_operation_timeout() -> Duration {
    Duration::from_millis(500)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            ttl: default_ttl(),
            max_entries: default_max_entries(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            operation_timeout: default_operation_timeout(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Pretty,
        }
    }
}
