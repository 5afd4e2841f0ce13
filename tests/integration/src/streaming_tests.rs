//! Streaming through the gateway

use crate::fixtures::*;
use crate::mock_providers::*;
use futures::StreamExt;
use gateway_config::ProviderKind;
use gateway_core::{EventStream, StreamEvent, StreamSummary};
use gateway_routing::{Gateway, GatewayError};

async fn open(gateway: &Gateway, prompt: &str) -> EventStream {
    gateway
        .generate_response(user_prompt(prompt), stream_options())
        .await
        .expect("stream opens")
        .into_stream()
        .expect("stream output")
}

fn summary(events: &[StreamEvent]) -> &StreamSummary {
    match events.last() {
        Some(StreamEvent::Finalized(summary)) => summary,
        other => panic!("expected final summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_with_reported_usage() {
    let server = MockOpenAICompatible::new().await;
    server
        .mock_streaming_response("gpt-4o-mini", &["Hel", "lo", " there"], Some((20, 3)))
        .await;

    let gateway = gateway(gateway_config(vec![openai_provider("openai", "gpt-4o-mini", &server.base_url())])).await;
    let events: Vec<StreamEvent> = open(&gateway, "Say hello").await.collect().await;

    let chunks: Vec<&str> = events.iter().filter_map(StreamEvent::delta).collect();
    assert_eq!(chunks, vec!["Hel", "lo", " there"]);
    assert!(events[..3]
        .iter()
        .all(|e| matches!(e, StreamEvent::Chunk { provider, .. } if provider == "openai")));

    let summary = summary(&events);
    assert_eq!(summary.full_content, "Hello there");
    assert_eq!(summary.provider, "openai");
    assert_eq!(summary.usage.prompt_tokens, 20);
    assert_eq!(summary.usage.completion_tokens, 3);
    assert!(!summary.usage.estimated);
    // 20 * 0.5/1K + 3 * 1.5/1K
    assert!((summary.cost - 0.0145).abs() < 1e-9);

    assert_eq!(gateway.usage_stats().providers_used["openai"].requests, 1);
}

#[tokio::test]
async fn test_stream_without_usage_is_estimated() {
    let server = MockOpenAICompatible::new().await;
    server
        .mock_streaming_response("llama-3.1-8b-instant", &["abcd", "efgh"], None)
        .await;

    let gateway = gateway(gateway_config(vec![provider(
        "groq",
        ProviderKind::Groq,
        "llama-3.1-8b-instant",
        &server.base_url(),
    )]))
    .await;
    let events: Vec<StreamEvent> = open(&gateway, "12345678").await.collect().await;

    let summary = summary(&events);
    assert_eq!(summary.full_content, "abcdefgh");
    assert!(summary.usage.estimated);
    assert_eq!(summary.usage.prompt_tokens, 2);
    assert_eq!(summary.usage.completion_tokens, 2);
}

#[tokio::test]
async fn test_stream_open_failure_falls_through() {
    let broken = MockOpenAICompatible::new().await;
    let working = MockOpenAICompatible::new().await;
    broken.mock_error(503, "server_error", "Service unavailable").await;
    working
        .mock_streaming_response("gpt-4o-mini", &["fallback ", "stream"], Some((4, 2)))
        .await;

    let gateway = gateway(gateway_config(vec![
        openai_provider("broken", "gpt-4o", &broken.base_url()),
        openai_provider("working", "gpt-4o-mini", &working.base_url()),
    ]))
    .await;
    let events: Vec<StreamEvent> = open(&gateway, "hi").await.collect().await;

    assert_eq!(summary(&events).provider, "working");
    assert_eq!(summary(&events).full_content, "fallback stream");
    assert_eq!(broken.calls().await, 1);
    assert_eq!(gateway.usage_stats().providers_used["broken"].failures, 1);
}

#[tokio::test]
async fn test_stream_fails_when_no_stream_opens() {
    let broken = MockOpenAICompatible::new().await;
    broken.mock_error(500, "server_error", "boom").await;

    let gateway = gateway(gateway_config(vec![openai_provider("broken", "gpt-4o", &broken.base_url())])).await;
    let err = gateway
        .generate_response(user_prompt("hi"), stream_options())
        .await
        .err()
        .expect("stream never opens");

    match err {
        GatewayError::AllProvidersFailed(failure) => {
            assert_eq!(failure.providers(), vec!["broken"]);
            assert_eq!(failure.attempts[0].error.kind(), "vendor");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_ollama_ndjson_stream() {
    let ollama = MockOllama::new().await;
    ollama.mock_chat_stream("llama3.2", &["Ray", "leigh"]).await;

    let gateway = gateway(gateway_config(vec![provider(
        "ollama",
        ProviderKind::Ollama,
        "llama3.2",
        &ollama.base_url(),
    )]))
    .await;
    let events: Vec<StreamEvent> = open(&gateway, "Why is the sky blue?").await.collect().await;

    assert_eq!(events.len(), 3);
    let summary = summary(&events);
    assert_eq!(summary.full_content, "Rayleigh");
    assert_eq!(summary.usage.prompt_tokens, 9);
    assert_eq!(summary.usage.completion_tokens, 2);
    assert_eq!(summary.cost, 0.0);
}
