//! Configuration and request fixtures

use gateway_config::{CacheConfig, GatewayConfig, LoggingSettings, ProviderConfig, ProviderKind, RoutingConfig};
use gateway_core::{ChatMessage, GenerateOptions};
use gateway_routing::Gateway;
use std::time::Duration;

/// Environment variable that is never set in tests
pub const UNSET_KEY_ENV: &str = "LLM_GATEWAY_TEST_KEY_THAT_IS_NEVER_SET";

/// OpenAI-compatible provider pointed at `base_url`
pub fn openai_provider(id: &str, model: &str, base_url: &str) -> ProviderConfig {
    ProviderConfig::new(id, ProviderKind::OpenAI, model)
        .with_api_key(format!("{id}-key"))
        .with_base_url(base_url)
        .with_pricing(0.5, 1.5)
}

/// Provider of `kind` pointed at `base_url`, free of charge
pub fn provider(id: &str, kind: ProviderKind, model: &str, base_url: &str) -> ProviderConfig {
    let config = ProviderConfig::new(id, kind, model).with_base_url(base_url);
    if kind.requires_api_key() {
        config.with_api_key(format!("{id}-key"))
    } else {
        config
    }
}

/// Provider whose key variable is unset, so it is never attempted
pub fn keyless_provider(id: &str, base_url: &str) -> ProviderConfig {
    let mut config = ProviderConfig::new(id, ProviderKind::OpenAI, "gpt-4o-mini").with_base_url(base_url);
    config.api_key_env = Some(UNSET_KEY_ENV.to_string());
    config
}

/// Gateway configuration over `providers` with an in-memory cache
pub fn gateway_config(providers: Vec<ProviderConfig>) -> GatewayConfig {
    GatewayConfig {
        providers,
        routing: RoutingConfig {
            attempt_timeout: Duration::from_secs(5),
            ..RoutingConfig::default()
        },
        cache: CacheConfig::default(),
        logging: LoggingSettings::default(),
    }
}

/// Single user message
pub fn user_prompt(prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(prompt)]
}

/// Blocking options
pub fn complete_options() -> GenerateOptions {
    GenerateOptions::default()
}

/// Streaming options without the cache
pub fn stream_options() -> GenerateOptions {
    GenerateOptions {
        stream: true,
        ..GenerateOptions::default()
    }
}

/// Build a gateway from `config`
pub async fn gateway(config: GatewayConfig) -> Gateway {
    Gateway::from_config(&config).await.expect("gateway builds")
}
