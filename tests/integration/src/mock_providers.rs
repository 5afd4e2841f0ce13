//! Mock LLM vendors for integration testing
//!
//! Wiremock servers that speak the OpenAI-compatible, Gemini and Ollama
//! wire formats.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_PATH: &str = "/v1/chat/completions";

/// Mock OpenAI-compatible API server (OpenAI, OpenRouter, Groq)
pub struct MockOpenAICompatible {
    pub server: MockServer,
}

impl MockOpenAICompatible {
    /// Start a new mock server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure the provider with
    pub fn base_url(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// Number of chat requests received
    pub async fn calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// Answer every chat request with `content`, expecting `expected` calls
    pub async fn mock_chat_completion(&self, model: &str, content: &str, usage: (u32, u32), expected: u64) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(openai_chat_response(model, content, usage)),
            )
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Answer after `delay`
    pub async fn mock_chat_completion_delayed(&self, model: &str, content: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(openai_chat_response(model, content, (10, 5)))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Fail every chat request with `status`
    pub async fn mock_error(&self, status: u16, error_type: &str, message: &str) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(openai_error_response(error_type, message)),
            )
            .mount(&self.server)
            .await;
    }

    /// Rate limit every chat request
    pub async fn mock_rate_limit(&self) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(openai_error_response("rate_limit_exceeded", "Rate limit exceeded"))
                    .insert_header("Retry-After", "60"),
            )
            .mount(&self.server)
            .await;
    }

    /// Must never be called
    pub async fn mock_never_called(&self) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Stream `chunks` as SSE, with a trailing usage frame when given
    pub async fn mock_streaming_response(&self, model: &str, chunks: &[&str], usage: Option<(u32, u32)>) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(openai_sse_body(model, chunks, usage), "text/event-stream"),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

/// Mock Google Gemini API server
pub struct MockGemini {
    pub server: MockServer,
}

impl MockGemini {
    /// Start a new mock server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure the provider with
    pub fn base_url(&self) -> String {
        format!("{}/v1beta", self.server.uri())
    }

    /// Answer `generateContent` for `model`
    pub async fn mock_generate(&self, model: &str, api_key: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{model}:generateContent")))
            .and(query_param("key", api_key))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(content)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Fail `generateContent` for `model` with `status`
    pub async fn mock_error(&self, model: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{model}:generateContent")))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {"code": status, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

/// Mock Ollama server
pub struct MockOllama {
    pub server: MockServer,
}

impl MockOllama {
    /// Start a new mock server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure the provider with
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Answer `/api/chat` with a single message
    pub async fn mock_chat(&self, model: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": model,
                "message": {"role": "assistant", "content": content},
                "done": true,
                "prompt_eval_count": 12,
                "eval_count": 4
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Stream `chunks` as NDJSON
    pub async fn mock_chat_stream(&self, model: &str, chunks: &[&str]) {
        let mut body: String = chunks
            .iter()
            .map(|chunk| {
                let line = json!({
                    "model": model,
                    "message": {"role": "assistant", "content": chunk},
                    "done": false
                });
                format!("{line}\n")
            })
            .collect();
        let last = json!({
            "model": model,
            "message": {"role": "assistant", "content": ""},
            "done": true,
            "prompt_eval_count": 9,
            "eval_count": chunks.len()
        });
        body.push_str(&format!("{last}\n"));

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

/// OpenAI chat completion body
pub fn openai_chat_response(model: &str, content: &str, (prompt, completion): (u32, u32)) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt,
            "completion_tokens": completion,
            "total_tokens": prompt + completion
        }
    })
}

/// OpenAI error body
pub fn openai_error_response(error_type: &str, message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "code": error_type
        }
    })
}

/// OpenAI SSE stream body
pub fn openai_sse_body(model: &str, chunks: &[&str], usage: Option<(u32, u32)>) -> String {
    let mut body: String = chunks
        .iter()
        .map(|chunk| {
            let frame = json!({
                "id": "chatcmpl-test",
                "object": "chat.completion.chunk",
                "model": model,
                "choices": [{"index": 0, "delta": {"content": chunk}, "finish_reason": null}]
            });
            format!("data: {frame}\n\n")
        })
        .collect();

    if let Some((prompt, completion)) = usage {
        let frame = json!({
            "id": "chatcmpl-test",
            "object": "chat.completion.chunk",
            "model": model,
            "choices": [],
            "usage": {
                "prompt_tokens": prompt,
                "completion_tokens": completion,
                "total_tokens": prompt + completion
            }
        });
        body.push_str(&format!("data: {frame}\n\n"));
    }

    body.push_str("data: [DONE]\n\n");
    body
}

/// Gemini `generateContent` body
pub fn gemini_response(content: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": content}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 3, "totalTokenCount": 11}
    })
}
