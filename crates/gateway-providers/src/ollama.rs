//! Ollama provider implementation.
//!
//! Talks to a local Ollama server through `/api/chat`. Blocking calls send
//! `stream: false`; streaming responses are newline-delimited JSON objects,
//! the last of which has `done: true` and carries the eval counts.

use crate::framing::{decode_frame, FrameBuffer};
use crate::http::{build_client, response_error, send_error};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    ChatMessage, Completion, FragmentStream, GatewayRequest, LLMProvider, ProviderDescriptor,
    ProviderError, StreamFragment, Usage,
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Descriptor exposed to the router
    pub descriptor: ProviderDescriptor,
    /// Server base URL
    pub base_url: String,
}

impl OllamaConfig {
    /// Create a configuration
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, base_url: impl Into<String>) -> Self {
        Self {
            descriptor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Ollama provider
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// Create a new provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: OllamaConfig) -> Result<Self, ProviderError> {
        let client = build_client(&config.descriptor.name)?;
        Ok(Self { config, client })
    }

    fn post(&self, body: &OllamaChatRequest) -> RequestBuilder {
        self.client
            .post(format!("{}/api/chat", self.config.base_url))
            .json(body)
    }

    fn chat_request(&self, request: &GatewayRequest, stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model().to_string(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            stream,
            format: request.wants_json().then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.config.descriptor
    }

    async fn generate(&self, request: &GatewayRequest) -> Result<Completion, ProviderError> {
        let provider = self.id();
        let body = self.chat_request(request, false);

        debug!(provider = %provider, model = %self.model(), "Sending Ollama chat request");

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| send_error(provider, &e))?;

        if !response.status().is_success() {
            return Err(response_error(provider, response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(provider, format!("Failed to read response: {e}")))?;
        let parsed: OllamaChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::malformed(provider, format!("Invalid response JSON: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::vendor(provider, 500, error));
        }
        let message = parsed
            .message
            .ok_or_else(|| ProviderError::malformed(provider, "Response has no message"))?;

        let mut completion = Completion::new(message.content, self.model());
        if let Some(usage) = usage_of(parsed.prompt_eval_count, parsed.eval_count) {
            completion = completion.with_usage(usage);
        }
        Ok(completion)
    }

    async fn stream(&self, request: &GatewayRequest) -> Result<FragmentStream, ProviderError> {
        let provider = self.id().to_string();
        let body = self.chat_request(request, true);

        debug!(provider = %provider, model = %self.model(), "Starting Ollama streaming request");

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|e| send_error(&provider, &e))?;

        if !response.status().is_success() {
            return Err(response_error(&provider, response).await);
        }

        let stream = try_stream! {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = FrameBuffer::new();
            let mut body_ended = false;
            let mut finished = false;

            while !finished {
                let line = match buffer.next_line() {
                    Some(line) => line,
                    None if body_ended => match buffer.take_remainder() {
                        Some(rest) => rest,
                        None => break,
                    },
                    None => {
                        match byte_stream.next().await {
                            Some(chunk) => {
                                let chunk = chunk.map_err(|e| ProviderError::stream(&provider, e.to_string()))?;
                                buffer.push(&chunk);
                            }
                            None => body_ended = true,
                        }
                        continue;
                    }
                };

                let line = decode_frame(&provider, line)?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let frame = match serde_json::from_str::<OllamaChatResponse>(line) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(provider = %provider, error = %e, "Skipping unparsable stream line");
                        continue;
                    }
                };

                if let Some(error) = frame.error {
                    Err::<(), ProviderError>(ProviderError::stream(&provider, error))?;
                }
                if let Some(message) = frame.message {
                    if !message.content.is_empty() {
                        yield StreamFragment::Delta(message.content);
                    }
                }
                if frame.done {
                    if let Some(usage) = usage_of(frame.prompt_eval_count, frame.eval_count) {
                        yield StreamFragment::Usage(usage);
                    }
                    finished = true;
                }
            }

            if !finished {
                Err::<(), ProviderError>(ProviderError::stream(&provider, "Stream ended before completion"))?;
            }
        };

        Ok(Box::pin(stream))
    }
}

fn usage_of(prompt: Option<u32>, completion: Option<u32>) -> Option<Usage> {
    match (prompt, completion) {
        (None, None) => None,
        (prompt, completion) => Some(Usage::new(prompt.unwrap_or(0), completion.unwrap_or(0))),
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for OllamaMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}
