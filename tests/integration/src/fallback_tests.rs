//! Ordered fallback across real provider clients

use crate::fixtures::*;
use crate::mock_providers::*;
use gateway_config::ProviderKind;
use gateway_core::{ChatMessage, GenerateOptions, ProviderError};
use gateway_routing::GatewayError;
use std::time::Duration;

#[tokio::test]
async fn test_falls_through_vendor_error() {
    let primary = MockOpenAICompatible::new().await;
    let secondary = MockOpenAICompatible::new().await;
    primary.mock_error(500, "server_error", "Internal server error").await;
    secondary.mock_chat_completion("gpt-4o-mini", "Paris", (100, 50), 1).await;

    let gateway = gateway(gateway_config(vec![
        openai_provider("primary", "gpt-4o", &primary.base_url()),
        openai_provider("secondary", "gpt-4o-mini", &secondary.base_url()),
    ]))
    .await;

    let response = gateway
        .generate_response(user_prompt("Capital of France?"), complete_options())
        .await
        .expect("secondary answers")
        .into_response()
        .expect("complete output");

    assert_eq!(response.content, "Paris");
    assert_eq!(response.provider, "secondary");
    assert_eq!(response.model, "gpt-4o-mini");
    assert_eq!(response.usage.prompt_tokens, 100);
    assert_eq!(response.usage.completion_tokens, 50);
    assert!(!response.usage.estimated);
    assert!(!response.cached);
    // 100 * 0.5/1K + 50 * 1.5/1K
    assert!((response.cost - 0.125).abs() < 1e-9);
    assert_eq!(primary.calls().await, 1);

    let stats = gateway.usage_stats();
    assert_eq!(stats.providers_used["primary"].failures, 1);
    assert_eq!(stats.providers_used["secondary"].requests, 1);
    assert_eq!(stats.total_tokens, 150);
}

#[tokio::test]
async fn test_configured_order_wins_over_declaration() {
    let first = MockOpenAICompatible::new().await;
    let second = MockOpenAICompatible::new().await;
    first.mock_never_called().await;
    second.mock_chat_completion("gpt-4o-mini", "ordered", (5, 1), 1).await;

    let mut config = gateway_config(vec![
        openai_provider("first", "gpt-4o", &first.base_url()),
        openai_provider("second", "gpt-4o-mini", &second.base_url()),
    ]);
    config.routing.fallback_order = vec!["second".to_string(), "first".to_string()];

    let response = gateway(config)
        .await
        .generate_response(user_prompt("hi"), complete_options())
        .await
        .expect("second answers")
        .into_response()
        .expect("complete output");

    assert_eq!(response.provider, "second");
}

#[tokio::test]
async fn test_preferred_provider_is_tried_first() {
    let default_first = MockOpenAICompatible::new().await;
    let preferred = MockOpenAICompatible::new().await;
    default_first.mock_never_called().await;
    preferred.mock_chat_completion("llama-3.1-8b-instant", "fast", (5, 1), 1).await;

    let gateway = gateway(gateway_config(vec![
        openai_provider("openai", "gpt-4o", &default_first.base_url()),
        provider("groq", ProviderKind::Groq, "llama-3.1-8b-instant", &preferred.base_url()),
    ]))
    .await;

    let options = GenerateOptions {
        provider: Some("groq".to_string()),
        ..GenerateOptions::default()
    };
    let response = gateway
        .generate_response(user_prompt("hi"), options)
        .await
        .expect("groq answers")
        .into_response()
        .expect("complete output");

    assert_eq!(response.provider, "groq");
    assert_eq!(response.cost, 0.0);
}

#[tokio::test]
async fn test_unavailable_provider_is_skipped() {
    let keyless = MockOpenAICompatible::new().await;
    let working = MockOpenAICompatible::new().await;
    keyless.mock_never_called().await;
    working.mock_chat_completion("gpt-4o-mini", "ok", (5, 1), 1).await;

    let gateway = gateway(gateway_config(vec![
        keyless_provider("keyless", &keyless.base_url()),
        openai_provider("working", "gpt-4o-mini", &working.base_url()),
    ]))
    .await;

    let listed = gateway.available_providers();
    assert_eq!(listed.len(), 2);
    assert!(!listed[0].is_available);
    assert_eq!(gateway.cheapest_provider().map(|p| p.name), Some("working".to_string()));

    let response = gateway
        .generate_response(user_prompt("hi"), complete_options())
        .await
        .expect("working answers")
        .into_response()
        .expect("complete output");
    assert_eq!(response.provider, "working");
}

#[tokio::test]
async fn test_all_providers_fail() {
    let limited = MockOpenAICompatible::new().await;
    let unauthorized = MockOpenAICompatible::new().await;
    limited.mock_rate_limit().await;
    unauthorized.mock_error(401, "invalid_api_key", "Incorrect API key provided").await;

    let gateway = gateway(gateway_config(vec![
        openai_provider("limited", "gpt-4o", &limited.base_url()),
        openai_provider("unauthorized", "gpt-4o-mini", &unauthorized.base_url()),
    ]))
    .await;

    let err = gateway
        .generate_response(user_prompt("hi"), complete_options())
        .await
        .err()
        .expect("every provider fails");

    let GatewayError::AllProvidersFailed(failure) = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(failure.providers(), vec!["limited", "unauthorized"]);
    assert!(!failure.deadline_exceeded);
    match &failure.attempts[0].error {
        ProviderError::RateLimited { retry_after, .. } => {
            assert_eq!(*retry_after, Some(Duration::from_secs(60)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(failure.attempts[1].error.kind(), "authentication");
    assert!(err.to_string().contains("limited"));
    assert!(err.to_string().contains("unauthorized"));
}

#[tokio::test]
async fn test_no_available_providers() {
    let gateway = gateway(gateway_config(vec![keyless_provider("keyless", "http://127.0.0.1:9")])).await;

    let err = gateway
        .generate_response(user_prompt("hi"), complete_options())
        .await
        .err()
        .expect("nothing to try");

    match err {
        GatewayError::AllProvidersFailed(failure) => assert!(failure.no_providers_attempted()),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_request_never_reaches_providers() {
    let server = MockOpenAICompatible::new().await;
    server.mock_never_called().await;

    let gateway = gateway(gateway_config(vec![openai_provider("openai", "gpt-4o", &server.base_url())])).await;

    let err = gateway
        .generate_response(Vec::<ChatMessage>::new(), complete_options())
        .await
        .err()
        .expect("empty conversation rejected");
    assert!(matches!(err, GatewayError::InvalidRequest(_)));

    let options = GenerateOptions {
        temperature: 3.5,
        ..GenerateOptions::default()
    };
    let err = gateway
        .generate_response(user_prompt("hi"), options)
        .await
        .err()
        .expect("temperature rejected");
    assert!(matches!(err, GatewayError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_slow_provider_times_out_and_falls_through() {
    let slow = MockOpenAICompatible::new().await;
    let fast = MockOpenAICompatible::new().await;
    slow.mock_chat_completion_delayed("gpt-4o", "too late", Duration::from_secs(3)).await;
    fast.mock_chat_completion("gpt-4o-mini", "in time", (5, 2), 1).await;

    let mut config = gateway_config(vec![
        openai_provider("slow", "gpt-4o", &slow.base_url()),
        openai_provider("fast", "gpt-4o-mini", &fast.base_url()),
    ]);
    config.routing.attempt_timeout = Duration::from_millis(200);

    let response = gateway(config)
        .await
        .generate_response(user_prompt("hi"), complete_options())
        .await
        .expect("fast answers")
        .into_response()
        .expect("complete output");

    assert_eq!(response.provider, "fast");
    assert_eq!(response.content, "in time");
}

#[tokio::test]
async fn test_falls_through_across_vendors() {
    let gemini = MockGemini::new().await;
    let ollama = MockOllama::new().await;
    gemini.mock_error("gemini-1.5-flash", 503).await;
    ollama.mock_chat("llama3.2", "local answer").await;

    let gateway = gateway(gateway_config(vec![
        provider("gemini", ProviderKind::GoogleGemini, "gemini-1.5-flash", &gemini.base_url()),
        provider("ollama", ProviderKind::Ollama, "llama3.2", &ollama.base_url()),
    ]))
    .await;

    let response = gateway
        .generate_response(user_prompt("hi"), complete_options())
        .await
        .expect("ollama answers")
        .into_response()
        .expect("complete output");

    assert_eq!(response.provider, "ollama");
    assert_eq!(response.content, "local answer");
    assert_eq!(response.usage.prompt_tokens, 12);
    assert_eq!(response.usage.completion_tokens, 4);
}

#[tokio::test]
async fn test_gemini_answers_with_system_prompt() {
    let gemini = MockGemini::new().await;
    gemini.mock_generate("gemini-1.5-flash", "gemini-key", "Bonjour").await;

    let gateway = gateway(gateway_config(vec![provider(
        "gemini",
        ProviderKind::GoogleGemini,
        "gemini-1.5-flash",
        &gemini.base_url(),
    )]))
    .await;

    let messages = vec![
        ChatMessage::system("Answer in French."),
        ChatMessage::user("Say hello"),
    ];
    let response = gateway
        .generate_response(messages, complete_options())
        .await
        .expect("gemini answers")
        .into_response()
        .expect("complete output");

    assert_eq!(response.content, "Bonjour");
    assert_eq!(response.usage.total_tokens, 11);
}
