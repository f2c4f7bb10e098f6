//! Provider adapter contract
//!
//! One adapter per upstream AI service. An adapter maps a [`CanonicalRequest`]
//! onto its service's wire format, performs the HTTP call and hands back the
//! model's raw text. It never parses or validates the payload; that belongs to
//! the extractor and the dispatcher.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::TransportError;
use crate::types::{GenerationRequest, InlineImage, ProviderId};

/// Appended to the system prompt when a structured payload is expected.
pub const JSON_ENFORCEMENT_INSTRUCTION: &str = "STRICT JSON ENFORCEMENT: You must respond ONLY with a valid JSON object matching the requested schema. No prose, no conversation, no markdown markers like ```json.";

/// Provider-neutral request handed to adapters.
#[derive(Debug, Clone, Default)]
pub struct CanonicalRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub images: Vec<InlineImage>,
    pub model: Option<String>,
    /// Caller credentials; adapters prefer these over their configured key
    pub api_key: Option<SecretString>,
    /// Ask the upstream for native JSON output when it supports it
    pub json_mode: bool,
}

impl CanonicalRequest {
    /// Build the canonical form of `request`.
    ///
    /// With `enforce_json` set and a target schema present, the JSON-only
    /// instruction is appended to the system prompt and `json_mode` is on.
    pub fn from_request(request: &GenerationRequest, enforce_json: bool) -> Self {
        let json_mode = enforce_json && request.target_schema.is_some();
        let system_prompt = if json_mode {
            if request.system_prompt.trim().is_empty() {
                JSON_ENFORCEMENT_INSTRUCTION.to_string()
            } else {
                format!("{}\n\n{}", request.system_prompt, JSON_ENFORCEMENT_INSTRUCTION)
            }
        } else {
            request.system_prompt.clone()
        };

        Self {
            system_prompt,
            user_prompt: request.user_prompt.clone(),
            images: request.images.clone(),
            model: request.model.clone(),
            api_key: request.api_key.clone(),
            json_mode,
        }
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// An upstream AI service.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Stable identity used for routing and health tracking.
    fn id(&self) -> ProviderId;

    /// Send the request and return the model's raw text.
    async fn invoke(&self, request: &CanonicalRequest) -> Result<String, TransportError>;
}
