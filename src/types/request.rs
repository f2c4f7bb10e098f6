//! Canonical structured-generation request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ProviderId;
use crate::error::GenerationError;
use crate::schema::SchemaDescriptor;

/// An image sent inline with the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload (standard alphabet, padded)
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes, sniffing the mime type when none is given.
    pub fn from_bytes(bytes: &[u8], mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(str::to_string)
            .or_else(|| infer::get(bytes).map(|kind| kind.mime_type().to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self {
            mime_type,
            data: BASE64.encode(bytes),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime_type = header.split(';').next().unwrap_or_default();
        if mime_type.is_empty() {
            return None;
        }
        Some(Self::new(mime_type, data))
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Structured-generation request built fresh by feature code for every call.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub images: Vec<InlineImage>,
    pub target_schema: Option<SchemaDescriptor>,
    /// Explicit provider; attempted first regardless of health
    pub provider: Option<ProviderId>,
    /// Caller-supplied credentials
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
    /// `None` means strict
    pub strict: Option<bool>,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_images(mut self, images: impl IntoIterator<Item = InlineImage>) -> Self {
        self.images.extend(images);
        self
    }

    pub fn with_schema(mut self, schema: SchemaDescriptor) -> Self {
        self.target_schema = Some(schema);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<ProviderId>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Blank keys are ignored, matching how settings forms submit an empty field.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        if !key.trim().is_empty() {
            self.api_key = Some(SecretString::from(key));
        }
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(true)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    /// Reject requests that no provider could serve.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.user_prompt.trim().is_empty() && self.images.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "user prompt cannot be empty".to_string(),
            ));
        }
        if let Some(image) = self.images.iter().find(|img| img.data.is_empty()) {
            return Err(GenerationError::InvalidRequest(format!(
                "inline image ({}) has an empty payload",
                image.mime_type
            )));
        }
        Ok(())
    }
}
