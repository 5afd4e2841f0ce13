//! Request types for the gateway.
//!
//! This module defines the normalized request every provider receives, regardless of vendor.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Sampling temperature used when the caller does not pick one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Normalized gateway request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Unique request identifier, used for log correlation
    #[serde(default = "generate_request_id")]
    pub id: String,

    /// Conversation messages, in order
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Stream partial output instead of returning one response
    #[serde(default)]
    pub stream: bool,

    /// Output format hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Provider to try before the configured fallback order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,

    /// Consult and populate the response cache (non-streaming only)
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_use_cache() -> bool {
    true
}

impl GatewayRequest {
    /// Create a new builder for `GatewayRequest`
    #[must_use]
    pub fn builder() -> GatewayRequestBuilder {
        GatewayRequestBuilder::default()
    }

    /// Build a request from caller messages and generation options
    ///
    /// # Errors
    /// Returns error if the resulting request is invalid
    pub fn from_options(
        messages: Vec<ChatMessage>,
        options: GenerateOptions,
    ) -> Result<Self, ValidationError> {
        let mut builder = Self::builder()
            .messages(messages)
            .temperature(options.temperature)
            .stream(options.stream)
            .use_cache(options.use_cache);

        if let Some(max_tokens) = options.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(format) = options.response_format {
            builder = builder.response_format(format);
        }
        if let Some(provider) = options.provider {
            builder = builder.preferred_provider(provider);
        }

        builder.build()
    }

    /// Validate the request
    ///
    /// # Errors
    /// Returns error if any field is out of range
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::EmptyMessages);
        }

        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::Temperature(self.temperature));
        }

        if self.max_tokens == Some(0) {
            return Err(ValidationError::MaxTokens);
        }

        Ok(())
    }

    /// Whether this request reads from and writes to the response cache
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.use_cache && !self.stream
    }

    /// Total character count across all messages
    #[must_use]
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }

    /// Content of the system messages, joined by blank lines
    #[must_use]
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Whether the caller asked for a JSON object
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.response_format == Some(ResponseFormat::JsonObject)
    }
}

/// Builder for `GatewayRequest`
#[derive(Debug)]
pub struct GatewayRequestBuilder {
    id: Option<String>,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: Option<u32>,
    stream: bool,
    response_format: Option<ResponseFormat>,
    preferred_provider: Option<String>,
    use_cache: bool,
}

impl Default for GatewayRequestBuilder {
    fn default() -> Self {
        Self {
            id: None,
            messages: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            stream: false,
            response_format: None,
            preferred_provider: None,
            use_cache: true,
        }
    }
}

impl GatewayRequestBuilder {
    /// Set the request ID
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the messages
    #[must_use]
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a message
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max_tokens
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable streaming
    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set response_format
    #[must_use]
    pub fn response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = Some(response_format);
        self
    }

    /// Set the preferred provider
    #[must_use]
    pub fn preferred_provider(mut self, provider: impl Into<String>) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }

    /// Enable or disable the response cache
    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns error if the request fails validation
    pub fn build(self) -> Result<GatewayRequest, ValidationError> {
        let request = GatewayRequest {
            id: self.id.unwrap_or_else(generate_request_id),
            messages: self.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: self.stream,
            response_format: self.response_format,
            preferred_provider: self.preferred_provider,
            use_cache: self.use_cache,
        };

        request.validate()?;

        Ok(request)
    }
}

/// Caller-facing generation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Explicit provider selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stream partial output
    #[serde(default)]
    pub stream: bool,
    /// Output format hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Use the response cache
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            provider: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            stream: false,
            response_format: None,
            use_cache: true,
        }
    }
}

/// Chat message with role and content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,
    /// Text content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl MessageRole {
    /// Wire name of the role
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text
    Text,
    /// A single JSON object
    JsonObject,
}

impl ResponseFormat {
    /// Wire name of the format
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::JsonObject => "json_object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GatewayRequest::builder()
            .message(ChatMessage::user("Hello"))
            .temperature(0.2)
            .max_tokens(100)
            .build()
            .expect("should build");

        assert_eq!(request.messages.len(), 1);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, Some(100));
        assert!(request.use_cache);
        assert!(!request.stream);
        assert!(!request.id.is_empty());
    }

    #[test]
    fn test_request_builder_missing_messages() {
        let request = GatewayRequest::builder().build();
        assert_eq!(request.unwrap_err(), ValidationError::EmptyMessages);
    }

    #[test]
    fn test_request_validation_invalid_temperature() {
        let request = GatewayRequest::builder()
            .message(ChatMessage::user("Hello"))
            .temperature(3.0)
            .build();

        assert!(matches!(request, Err(ValidationError::Temperature(_))));
    }

    #[test]
    fn test_request_validation_zero_max_tokens() {
        let request = GatewayRequest::builder()
            .message(ChatMessage::user("Hello"))
            .max_tokens(0)
            .build();

        assert_eq!(request.unwrap_err(), ValidationError::MaxTokens);
    }

    #[test]
    fn test_from_options() {
        let options = GenerateOptions {
            provider: Some("openai".to_string()),
            stream: true,
            response_format: Some(ResponseFormat::JsonObject),
            ..Default::default()
        };
        let request =
            GatewayRequest::from_options(vec![ChatMessage::user("hi")], options).expect("valid");

        assert_eq!(request.preferred_provider.as_deref(), Some("openai"));
        assert!(request.stream);
        assert!(request.wants_json());
        assert!(!request.is_cacheable());
    }

    #[test]
    fn test_prompt_helpers() {
        let request = GatewayRequest::builder()
            .message(ChatMessage::system("Be terse"))
            .message(ChatMessage::user("What is Rust?"))
            .message(ChatMessage::system("Answer in English"))
            .build()
            .expect("valid");

        assert_eq!(request.prompt_chars(), 8 + 13 + 17);
        assert_eq!(
            request.system_prompt().as_deref(),
            Some("Be terse\n\nAnswer in English")
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let request: GatewayRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"hi"}]}"#,
        )
        .expect("deserialize");

        assert!((request.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert!(request.use_cache);
        assert_eq!(request.messages[0].role, MessageRole::User);
    }

    #[test]
    fn test_response_format_serialization() {
        let json = serde_json::to_string(&ResponseFormat::JsonObject).expect("serialize");
        assert_eq!(json, "\"json_object\"");
    }
}
