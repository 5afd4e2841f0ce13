//! Google Gemini provider implementation.
//!
//! Uses the Generative Language API: `models/{model}:generateContent` for
//! blocking calls and `models/{model}:streamGenerateContent?alt=sse` for
//! streaming. System messages become `systemInstruction`; assistant turns use
//! the `model` role.

use crate::framing::{decode_frame, event_data, FrameBuffer};
use crate::http::{build_client, response_error, send_error};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    Completion, FragmentStream, GatewayRequest, LLMProvider, MessageRole, ProviderDescriptor,
    ProviderError, StreamFragment, Usage,
};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Gemini provider configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Descriptor exposed to the router
    pub descriptor: ProviderDescriptor,
    /// API base URL
    pub base_url: String,
    /// API key, sent as the `key` query parameter
    pub api_key: Option<SecretString>,
}

impl GeminiConfig {
    /// Create a configuration
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, base_url: impl Into<String>) -> Self {
        Self {
            descriptor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

/// Google Gemini provider
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a new provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = build_client(&config.descriptor.name)?;
        Ok(Self { config, client })
    }

    fn endpoint_url(&self, streaming: bool) -> String {
        let action = if streaming {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        format!("{}/models/{}:{}", self.config.base_url, self.model(), action)
    }

    fn post(&self, streaming: bool, body: &GeminiRequest) -> RequestBuilder {
        let mut builder = self.client.post(self.endpoint_url(streaming));
        if streaming {
            builder = builder.query(&[("alt", "sse")]);
        }
        if let Some(key) = &self.config.api_key {
            builder = builder.query(&[("key", key.expose_secret().as_str())]);
        }
        builder.json(body)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.config.descriptor
    }

    async fn generate(&self, request: &GatewayRequest) -> Result<Completion, ProviderError> {
        let provider = self.id();
        let body = GeminiRequest::from(request);

        debug!(provider = %provider, model = %self.model(), "Sending generateContent request");

        let response = self
            .post(false, &body)
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
        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::malformed(provider, format!("Invalid response JSON: {e}")))?;

        if parsed.candidates.is_empty() {
            return Err(ProviderError::malformed(provider, "No candidates in response"));
        }

        let usage = parsed.usage();
        let mut completion = Completion::new(parsed.text(), self.model());
        if let Some(usage) = usage {
            completion = completion.with_usage(usage);
        }
        Ok(completion)
    }

    async fn stream(&self, request: &GatewayRequest) -> Result<FragmentStream, ProviderError> {
        let provider = self.id().to_string();
        let body = GeminiRequest::from(request);

        debug!(provider = %provider, model = %self.model(), "Sending streamGenerateContent request");

        let response = self
            .post(true, &body)
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
            let mut usage = None;

            loop {
                let event = match buffer.next_event() {
                    Some(event) => event,
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

                let event = decode_frame(&provider, event)?;
                let Some(data) = event_data(&event) else { continue };
                let frame = match serde_json::from_str::<GeminiResponse>(&data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(provider = %provider, error = %e, "Skipping unparsable stream frame");
                        continue;
                    }
                };

                if let Some(error) = &frame.error {
                    Err::<(), ProviderError>(ProviderError::stream(&provider, error.message.as_str()))?;
                }
                if let Some(frame_usage) = frame.usage() {
                    usage = Some(frame_usage);
                }
                finished |= frame.is_finished();
                let text = frame.text();
                if !text.is_empty() {
                    yield StreamFragment::Delta(text);
                }
            }

            if !finished {
                Err::<(), ProviderError>(ProviderError::stream(&provider, "Stream ended before completion"))?;
            }
            // usageMetadata is cumulative; only the last report counts
            if let Some(usage) = usage {
                yield StreamFragment::Usage(usage);
            }
        };

        Ok(Box::pin(stream))
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

impl From<&GatewayRequest> for GeminiRequest {
    fn from(request: &GatewayRequest) -> Self {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| GeminiContent {
                role: Some(
                    if m.role == MessageRole::Assistant {
                        "model"
                    } else {
                        "user"
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let system_instruction = request.system_prompt().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text }],
        });

        Self {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: request.wants_json().then_some("application/json"),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    error: Option<GeminiError>,
}

impl GeminiResponse {
    /// Text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }

    /// A candidate carries a finish reason once generation stops
    fn is_finished(&self) -> bool {
        self.candidates.iter().any(|c| c.finish_reason.is_some())
    }

    fn usage(&self) -> Option<Usage> {
        self.usage_metadata
            .as_ref()
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
