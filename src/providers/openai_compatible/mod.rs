//! OpenAI-compatible chat-completions adapter
//!
//! Serves the free backup provider (Pollinations by default) and any other
//! endpoint that speaks `POST {base}/chat/completions`.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::adapter::{CanonicalRequest, ProviderAdapter};
use crate::error::{GenerationError, TransportError};
use crate::observability::mask_secret;
use crate::types::ProviderId;
use crate::utils::{HttpRequestContext, build_http_client, join_url, send_json};

pub use wire::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, ContentPart, ImageUrl,
    MessageContent, ResponseFormat, ResponseMessage,
};

pub const DEFAULT_BASE_URL: &str = "https://gen.pollinations.ai/v1";
pub const DEFAULT_MODEL: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Optional bearer token; the free tier works without one
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: None,
        }
    }
}

impl OpenAiCompatibleConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        self.api_key = (!key.trim().is_empty()).then(|| SecretString::from(key));
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleAdapter {
    id: ProviderId,
    config: OpenAiCompatibleConfig,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    /// Build the adapter as the backup provider.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, GenerationError> {
        let http_client = build_http_client(config.timeout)?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: OpenAiCompatibleConfig, http_client: reqwest::Client) -> Self {
        Self {
            id: ProviderId::Backup,
            config,
            http_client,
        }
    }

    pub fn with_id(mut self, id: ProviderId) -> Self {
        self.id = id;
        self
    }

    pub fn config(&self) -> &OpenAiCompatibleConfig {
        &self.config
    }

    pub fn build_request_body(&self, request: &CanonicalRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(request.system_prompt.clone()),
            });
        }

        let user_content = if request.has_images() {
            let mut parts = vec![ContentPart::Text {
                text: request.user_prompt.clone(),
            }];
            parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            }));
            MessageContent::Parts(parts)
        } else {
            MessageContent::Text(request.user_prompt.clone())
        };
        messages.push(ChatMessage {
            role: "user",
            content: user_content,
        });

        ChatCompletionRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            stream: false,
            response_format: request.json_mode.then_some(ResponseFormat::JSON_OBJECT),
            max_tokens: self.config.max_tokens,
        }
    }

    async fn post(&self, ctx: &HttpRequestContext, body: &ChatCompletionRequest, api_key: Option<&SecretString>) -> Result<String, TransportError> {
        let mut builder = self.http_client.post(&ctx.url);
        if let Some(key) = api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        send_json(ctx, builder, &serde_json::to_value(body)?).await
    }
}

/// Pull the model's text out of a chat-completions reply.
///
/// Bodies without a `choices` array are returned as they are, since some
/// endpoints answer with plain text. A message with no text but with tool
/// calls or reasoning is passed on as a small JSON envelope so the extractor
/// can unwrap or reject it.
fn response_text(body: &str) -> Result<String, TransportError> {
    if body.trim().is_empty() {
        return Err(TransportError::EmptyResponse);
    }
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return Ok(body.to_string()),
    };
    if value.get("choices").is_none() {
        return Ok(body.to_string());
    }

    let response: ChatCompletionResponse = serde_json::from_value(value)?;
    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| TransportError::MalformedResponse("reply has no choices".to_string()))?;

    let text = message.text();
    if !text.trim().is_empty() {
        return Ok(text);
    }
    if let Some(tool_calls) = message.tool_calls.filter(|v| !v.is_null()) {
        return Ok(json!({ "tool_calls": tool_calls }).to_string());
    }
    match message.reasoning_content {
        Some(reasoning) if !reasoning.trim().is_empty() => {
            Ok(json!({ "reasoning_content": reasoning }).to_string())
        }
        _ => Err(TransportError::EmptyResponse),
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn invoke(&self, request: &CanonicalRequest) -> Result<String, TransportError> {
        let api_key = request.api_key.as_ref().or(self.config.api_key.as_ref());
        if let Some(key) = api_key {
            tracing::debug!(target: "mindscape_ai::http", provider = %self.id, key = %mask_secret(key.expose_secret()), "using bearer credentials");
        }
        let ctx = HttpRequestContext {
            provider: self.id.clone(),
            url: join_url(&self.config.base_url, "chat/completions"),
        };
        let body = self.build_request_body(request);

        let text = match self.post(&ctx, &body, api_key).await {
            Err(TransportError::Client { status: 400, message }) if body.has_optional_parameters() => {
                tracing::warn!(
                    target: "mindscape_ai::http",
                    provider = %self.id,
                    %message,
                    "upstream rejected request parameters, retrying without response_format/max_tokens"
                );
                self.post(&ctx, &body.without_optional_parameters(), api_key)
                    .await?
            }
            other => other?,
        };

        response_text(&text)
    }
}
