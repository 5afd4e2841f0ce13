//! Response cache behaviour through the gateway

use crate::fixtures::*;
use crate::mock_providers::*;
use futures::StreamExt;
use gateway_core::{ChatMessage, GenerateOptions, GatewayResponse, StreamEvent};
use gateway_routing::Gateway;

async fn complete(gateway: &Gateway, messages: Vec<ChatMessage>, options: GenerateOptions) -> GatewayResponse {
    gateway
        .generate_response(messages, options)
        .await
        .expect("request succeeds")
        .into_response()
        .expect("complete output")
}

#[tokio::test]
async fn test_repeated_request_is_served_from_cache() {
    let server = MockOpenAICompatible::new().await;
    server.mock_chat_completion("gpt-4o-mini", "cached answer", (10, 4), 1).await;

    let gateway = gateway(gateway_config(vec![openai_provider("openai", "gpt-4o-mini", &server.base_url())])).await;

    let first = complete(&gateway, user_prompt("What is 2+2?"), complete_options()).await;
    let second = complete(&gateway, user_prompt("What is 2+2?"), complete_options()).await;

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.content, first.content);
    assert_eq!(second.provider, "openai");
    assert_eq!(second.usage, first.usage);

    let stats = gateway.cache_stats();
    assert!(stats.enabled);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.writes, 1);
    assert_eq!(gateway.usage_stats().cache_hits, 1);
}

#[tokio::test]
async fn test_opt_out_bypasses_cache() {
    let server = MockOpenAICompatible::new().await;
    server.mock_chat_completion("gpt-4o-mini", "fresh", (10, 4), 2).await;

    let gateway = gateway(gateway_config(vec![openai_provider("openai", "gpt-4o-mini", &server.base_url())])).await;
    let no_cache = || GenerateOptions {
        use_cache: false,
        ..GenerateOptions::default()
    };

    let first = complete(&gateway, user_prompt("What is 2+2?"), no_cache()).await;
    let second = complete(&gateway, user_prompt("What is 2+2?"), no_cache()).await;

    assert!(!first.cached);
    assert!(!second.cached);
    assert_eq!(gateway.cache_stats().writes, 0);
}

#[tokio::test]
async fn test_disabled_cache_calls_provider_every_time() {
    let server = MockOpenAICompatible::new().await;
    server.mock_chat_completion("gpt-4o-mini", "fresh", (10, 4), 2).await;

    let mut config = gateway_config(vec![openai_provider("openai", "gpt-4o-mini", &server.base_url())]);
    config.cache.enabled = false;
    let gateway = gateway(config).await;

    complete(&gateway, user_prompt("What is 2+2?"), complete_options()).await;
    let second = complete(&gateway, user_prompt("What is 2+2?"), complete_options()).await;

    assert!(!second.cached);
    assert!(!gateway.cache_stats().enabled);
}

#[tokio::test]
async fn test_different_conversations_do_not_share_entries() {
    let server = MockOpenAICompatible::new().await;
    server.mock_chat_completion("gpt-4o-mini", "answer", (10, 4), 2).await;

    let gateway = gateway(gateway_config(vec![openai_provider("openai", "gpt-4o-mini", &server.base_url())])).await;

    complete(&gateway, user_prompt("What is 2+2?"), complete_options()).await;
    let with_system = vec![
        ChatMessage::system("You are terse."),
        ChatMessage::user("What is 2+2?"),
    ];
    let second = complete(&gateway, with_system, complete_options()).await;

    assert!(!second.cached);
}

#[tokio::test]
async fn test_streaming_never_reads_cache() {
    let server = MockOpenAICompatible::new().await;
    server
        .mock_streaming_response("gpt-4o-mini", &["streamed"], Some((10, 1)))
        .await;
    server.mock_chat_completion("gpt-4o-mini", "cached answer", (10, 4), 1).await;

    let gateway = gateway(gateway_config(vec![openai_provider("openai", "gpt-4o-mini", &server.base_url())])).await;
    complete(&gateway, user_prompt("What is 2+2?"), complete_options()).await;

    let events: Vec<StreamEvent> = gateway
        .generate_response(user_prompt("What is 2+2?"), stream_options())
        .await
        .expect("stream opens")
        .into_stream()
        .expect("stream output")
        .collect()
        .await;

    assert!(matches!(events.last(), Some(StreamEvent::Finalized(s)) if s.full_content == "streamed"));
    let stats = gateway.cache_stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.writes, 1);
}
