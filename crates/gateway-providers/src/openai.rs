//! OpenAI-compatible chat completions provider.
//!
//! Serves OpenAI itself and the vendors that expose the same API surface
//! (OpenRouter, Groq). Differences between them are limited to base URL,
//! extra headers, and whether streaming usage can be requested.
//!
//! The wire types and SSE decoding here are shared with the Azure provider.

use crate::http::{build_client, response_error, send_error, status_error};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{
    ChatMessage, Completion, FragmentStream, GatewayRequest, LLMProvider, ProviderDescriptor,
    ProviderError, StreamFragment, Usage,
};
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{retry::Never, Event, EventSource};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAICompatibleConfig {
    /// Descriptor exposed to the router
    pub descriptor: ProviderDescriptor,
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<SecretString>,
    /// Extra headers sent with every request
    pub headers: Vec<(String, String)>,
    /// Send `stream_options.include_usage` on streaming requests
    pub stream_usage: bool,
}

impl OpenAICompatibleConfig {
    /// Create a configuration
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, base_url: impl Into<String>) -> Self {
        Self {
            descriptor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            headers: Vec::new(),
            stream_usage: true,
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Enable or disable streaming usage reporting
    #[must_use]
    pub fn with_stream_usage(mut self, enabled: bool) -> Self {
        self.stream_usage = enabled;
        self
    }
}

/// OpenAI-compatible provider implementation
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self, ProviderError> {
        let client = build_client(&config.descriptor.name)?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn post(&self, body: &ChatCompletionRequest) -> RequestBuilder {
        let mut builder = self.client.post(self.completions_url()).json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        for (name, value) in &self.config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.config.descriptor
    }

    async fn generate(&self, request: &GatewayRequest) -> Result<Completion, ProviderError> {
        let provider = self.id();
        let body = ChatCompletionRequest::new(request, Some(self.model()));

        debug!(provider = %provider, model = %self.model(), "Sending chat completion request");

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
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::malformed(provider, format!("Invalid response JSON: {e}")))?;

        parsed.into_completion(provider, self.model())
    }

    async fn stream(&self, request: &GatewayRequest) -> Result<FragmentStream, ProviderError> {
        let body = ChatCompletionRequest::new(request, Some(self.model()))
            .streaming(self.config.stream_usage);

        debug!(provider = %self.id(), model = %self.model(), "Starting streaming request");

        open_event_stream(self.id(), self.post(&body)).await
    }
}

// ============================================================================
// Chat completions wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

impl ChatCompletionRequest {
    /// `model` is omitted for Azure, where the deployment is in the URL
    pub(crate) fn new(request: &GatewayRequest, model: Option<&str>) -> Self {
        Self {
            model: model.map(str::to_string),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            stream_options: None,
            response_format: request.wants_json().then_some(WireResponseFormat {
                format_type: "json_object",
            }),
        }
    }

    pub(crate) fn streaming(mut self, include_usage: bool) -> Self {
        self.stream = true;
        if include_usage {
            self.stream_options = Some(StreamOptions {
                include_usage: true,
            });
        }
        self
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

impl ChatCompletionResponse {
    pub(crate) fn into_completion(
        self,
        provider: &str,
        model: &str,
    ) -> Result<Completion, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed(provider, "No choices in response"))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| ProviderError::malformed(provider, "Choice has no content"))?;

        let mut completion = Completion::new(content, model);
        if let Some(usage) = self.usage {
            completion = completion.with_usage(usage.into());
        }
        Ok(completion)
    }
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        Self::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireStreamError>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    #[serde(default)]
    delta: WireChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStreamError {
    #[serde(default)]
    message: String,
}

/// Outcome of decoding one SSE `data:` payload
#[derive(Debug, PartialEq)]
enum SseChunk {
    Done,
    Fragments {
        fragments: Vec<StreamFragment>,
        /// A choice reported its finish reason
        finished: bool,
    },
}

impl SseChunk {
    fn empty() -> Self {
        Self::Fragments {
            fragments: Vec::new(),
            finished: false,
        }
    }
}

fn decode_chunk(provider: &str, data: &str) -> Result<SseChunk, ProviderError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseChunk::Done);
    }

    let chunk = match serde_json::from_str::<WireChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!(provider = %provider, error = %e, data = %data, "Skipping unparsable stream chunk");
            return Ok(SseChunk::empty());
        }
    };

    if let Some(error) = chunk.error {
        return Err(ProviderError::stream(provider, error.message));
    }

    let finished = chunk.choices.iter().any(|c| c.finish_reason.is_some());
    let mut fragments: Vec<StreamFragment> = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .filter(|content| !content.is_empty())
        .map(StreamFragment::Delta)
        .collect();
    if let Some(usage) = chunk.usage {
        fragments.push(StreamFragment::Usage(usage.into()));
    }
    Ok(SseChunk::Fragments { fragments, finished })
}

/// Open a chat completions event stream
///
/// Waits for the connection to open so that status and transport failures
/// surface here rather than inside the stream. Reconnects are disabled.
pub(crate) async fn open_event_stream(
    provider: &str,
    builder: RequestBuilder,
) -> Result<FragmentStream, ProviderError> {
    let mut source = EventSource::new(builder).map_err(|e| {
        ProviderError::network(provider, format!("Failed to create event source: {e}"))
    })?;
    source.set_retry_policy(Box::new(Never));

    let pending = match source.next().await {
        Some(Ok(Event::Open)) => {
            trace!(provider = %provider, "Event stream opened");
            None
        }
        Some(Ok(Event::Message(message))) => Some(message.data),
        Some(Err(e)) => {
            source.close();
            return Err(open_error(provider, e).await);
        }
        None => {
            return Err(ProviderError::stream(provider, "Stream closed before opening"));
        }
    };

    let provider = provider.to_string();
    let stream = try_stream! {
        let mut source = source;
        let mut pending = pending;
        let mut finished = false;

        loop {
            let data = if let Some(data) = pending.take() {
                data
            } else {
                match source.next().await {
                    Some(Ok(Event::Open)) => continue,
                    Some(Ok(Event::Message(message))) => message.data,
                    Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => break,
                    Some(Err(e)) => {
                        source.close();
                        Err::<String, ProviderError>(ProviderError::stream(&provider, e.to_string()))?
                    }
                }
            };

            match decode_chunk(&provider, &data) {
                Ok(SseChunk::Done) => {
                    finished = true;
                    break;
                }
                Ok(SseChunk::Fragments { fragments, finished: choice_finished }) => {
                    finished |= choice_finished;
                    for fragment in fragments {
                        yield fragment;
                    }
                }
                Err(e) => {
                    source.close();
                    Err::<(), ProviderError>(e)?;
                }
            }
        }

        source.close();
        if !finished {
            Err::<(), ProviderError>(ProviderError::stream(&provider, "Stream ended before completion"))?;
        }
    };

    Ok(Box::pin(stream))
}

async fn open_error(provider: &str, error: reqwest_eventsource::Error) -> ProviderError {
    use reqwest_eventsource::Error;

    match error {
        Error::InvalidStatusCode(status, response) => {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            status_error(provider, status, &headers, &body)
        }
        Error::InvalidContentType(content_type, _) => ProviderError::malformed(
            provider,
            format!("Unexpected content type: {content_type:?}"),
        ),
        Error::Transport(e) => send_error(provider, &e),
        other => ProviderError::stream(provider, other.to_string()),
    }
}
