//! Azure OpenAI provider implementation.
//!
//! Key differences from OpenAI:
//! - URL structure: `{endpoint}/openai/deployments/{deployment}/chat/completions`
//! - Authentication via API key in `api-key` header
//! - API version required as query parameter
//!
//! The descriptor model is the deployment name.

use crate::http::{build_client, response_error, send_error};
use crate::openai::{open_event_stream, ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use gateway_config::DEFAULT_AZURE_API_VERSION;
use gateway_core::{
    Completion, FragmentStream, GatewayRequest, LLMProvider, ProviderDescriptor, ProviderError,
};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Azure OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct AzureOpenAIConfig {
    /// Descriptor exposed to the router; `model` is the deployment name
    pub descriptor: ProviderDescriptor,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// API key
    pub api_key: Option<SecretString>,
    /// API version (default: 2024-02-15-preview)
    pub api_version: String,
}

impl AzureOpenAIConfig {
    /// Create a new Azure OpenAI configuration
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, endpoint: impl Into<String>) -> Self {
        Self {
            descriptor,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Set the API version
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Chat completions URL for the configured deployment
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.descriptor.model
        )
    }
}

/// Azure OpenAI provider
pub struct AzureOpenAIProvider {
    config: AzureOpenAIConfig,
    client: Client,
}

impl AzureOpenAIProvider {
    /// Create a new Azure OpenAI provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: AzureOpenAIConfig) -> Result<Self, ProviderError> {
        let client = build_client(&config.descriptor.name)?;
        Ok(Self { config, client })
    }

    fn post(&self, body: &ChatCompletionRequest) -> RequestBuilder {
        let mut builder = self
            .client
            .post(self.config.completions_url())
            .query(&[("api-version", self.config.api_version.as_str())])
            .json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("api-key", key.expose_secret().as_str());
        }
        builder
    }
}

#[async_trait]
impl LLMProvider for AzureOpenAIProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.config.descriptor
    }

    async fn generate(&self, request: &GatewayRequest) -> Result<Completion, ProviderError> {
        let provider = self.id();
        let body = ChatCompletionRequest::new(request, None);

        debug!(
            provider = %provider,
            deployment = %self.model(),
            api_version = %self.config.api_version,
            "Sending Azure OpenAI request"
        );

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
        // Older api-versions reject stream_options
        let body = ChatCompletionRequest::new(request, None).streaming(false);

        debug!(provider = %self.id(), deployment = %self.model(), "Starting Azure streaming request");

        open_event_stream(self.id(), self.post(&body)).await
    }
}
