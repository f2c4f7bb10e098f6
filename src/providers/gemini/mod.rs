//! Google Gemini adapter
//!
//! Calls `models/{model}:generateContent` and returns the first candidate's
//! text. The same adapter serves the hosted provider (server key) and the
//! custom-key provider (caller key) by registering it under two identities.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::adapter::{CanonicalRequest, ProviderAdapter};
use crate::error::{GenerationError, TransportError};
use crate::observability::mask_secret;
use crate::types::ProviderId;
use crate::utils::{HttpRequestContext, build_http_client, join_url, send_json};

pub use wire::{
    Blob, Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini adapter configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Server-side key; a caller key on the request takes precedence
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        self.api_key = (!key.trim().is_empty()).then(|| SecretString::from(key));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    id: ProviderId,
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiAdapter {
    /// Build the adapter as the hosted provider.
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http_client = build_http_client(config.timeout)?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: GeminiConfig, http_client: reqwest::Client) -> Self {
        Self {
            id: ProviderId::Hosted,
            config,
            http_client,
        }
    }

    /// Register under a different identity (e.g. [`ProviderId::CustomKey`]).
    pub fn with_id(mut self, id: ProviderId) -> Self {
        self.id = id;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn build_request_body(&self, request: &CanonicalRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::text(&request.user_prompt)];
        parts.extend(request.images.iter().map(|image| Part::InlineData {
            inline_data: Blob {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }));

        let system_instruction = (!request.system_prompt.trim().is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::text(&request.system_prompt)],
        });

        let generation_config = request.json_mode.then(|| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            ..Default::default()
        });

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction,
            generation_config,
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn invoke(&self, request: &CanonicalRequest) -> Result<String, TransportError> {
        let api_key = request
            .api_key
            .as_ref()
            .or(self.config.api_key.as_ref())
            .ok_or_else(|| TransportError::Unauthorized {
                status: 401,
                message: "no Gemini API key configured".to_string(),
            })?;
        tracing::debug!(
            target: "mindscape_ai::http",
            provider = %self.id,
            key = %mask_secret(api_key.expose_secret()),
            caller_key = request.api_key.is_some(),
            "resolved Gemini credentials"
        );

        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let url = join_url(
            &self.config.base_url,
            &format!("models/{}:generateContent", urlencoding::encode(model)),
        );
        let body = serde_json::to_value(self.build_request_body(request))?;

        let ctx = HttpRequestContext {
            provider: self.id.clone(),
            url: url.clone(),
        };
        let builder = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret());
        let text = send_json(&ctx, builder, &body).await?;

        let response: GenerateContentResponse = serde_json::from_str(&text)?;
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(target: "mindscape_ai::http", provider = %self.id, block_reason = reason, "prompt blocked upstream");
            return Err(TransportError::EmptyResponse);
        }

        let output = response.text();
        if output.trim().is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        Ok(output)
    }
}
