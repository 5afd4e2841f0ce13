//! Shared HTTP plumbing for vendor clients.

use gateway_core::ProviderError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Longest vendor error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Build the HTTP client used by a provider
///
/// No overall request timeout is set here; attempt timeouts are enforced by
/// the caller so streaming bodies are not cut off.
pub(crate) fn build_client(provider: &str) -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| ProviderError::network(provider, format!("Failed to create HTTP client: {e}")))
}

/// Map a transport failure
pub(crate) fn send_error(provider: &str, error: &reqwest::Error) -> ProviderError {
    ProviderError::network(provider, format!("Request failed: {error}"))
}

/// Map a non-success status and its body
pub(crate) fn status_error(
    provider: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> ProviderError {
    let message = error_message(body);
    match status.as_u16() {
        401 | 403 => ProviderError::authentication(provider, message),
        429 => ProviderError::rate_limited(provider, message, retry_after(headers)),
        code => ProviderError::vendor(provider, code, message),
    }
}

/// Read a failed response and map it
pub(crate) async fn response_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    status_error(provider, status, &headers, &body)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}

/// Pull the human-readable message out of a vendor error body
///
/// Understands `{"error": {"message": ..}}` (OpenAI, Azure, Gemini, Groq,
/// OpenRouter) and `{"error": ".."}` (Ollama); anything else is truncated.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return match envelope.error {
            ErrorBody::Detailed { message } | ErrorBody::Plain(message) => message,
        };
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if trimmed.len() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
