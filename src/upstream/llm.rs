//! OpenAI-compatible chat-completion client.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::retry::RetryPolicy;
use crate::error::GatewayError;

/// One message of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System prompt message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling settings for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl CompletionOptions {
    /// Low-temperature settings for structured extraction.
    pub const EXTRACTION: Self = Self {
        temperature: 0.3,
        max_tokens: 500,
    };

    /// Settings for free-form replies.
    pub const REPLY: Self = Self {
        temperature: 0.7,
        max_tokens: 1000,
    };
}

/// Text completion collaborator.
///
/// Output is opaque, untrusted text; callers must validate anything they
/// derive from it.
#[async_trait]
pub trait CompletionClient: fmt::Debug + Send + Sync {
    /// Completes the transcript and returns the assistant's text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamFetch`] or
    /// [`GatewayError::UpstreamTimeout`] when the service is unavailable or
    /// answers without content.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, GatewayError>;
}

/// [`CompletionClient`] for any `POST {endpoint}/chat/completions` service.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpCompletionClient {
    /// Creates a client for `endpoint` (the API base, e.g. `.../v1`).
    #[must_use]
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            retry,
        }
    }

    async fn complete_once(&self, payload: &serde_json::Value) -> Result<String, GatewayError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::UpstreamTimeout {
                    timeout_ms: u64::try_from(self.retry.attempt_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                }
            } else {
                GatewayError::UpstreamFetch {
                    status: None,
                    message: format!("completion request failed: {e}"),
                }
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| GatewayError::UpstreamFetch {
            status: Some(status.as_u16()),
            message: format!("completion body unreadable: {e}"),
        })?;
        if !status.is_success() {
            return Err(GatewayError::UpstreamFetch {
                status: Some(status.as_u16()),
                message: format!("completion service returned {status}"),
            });
        }

        extract_content(&body)
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, GatewayError> {
        let payload = json!({
            "model": self.model,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "messages": messages,
        });
        self.retry
            .execute("completion", || self.complete_once(&payload))
            .await
    }
}

/// Reads `choices[0].message.content` from a completion response body.
fn extract_content(body: &str) -> Result<String, GatewayError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| GatewayError::UpstreamFetch {
            status: Some(502),
            message: format!("malformed completion response: {e}"),
        })?;

    value
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::UpstreamFetch {
            status: Some(502),
            message: "completion response missing content".to_string(),
        })
}
