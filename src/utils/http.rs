//! Shared HTTP plumbing for the reference adapters.

use std::time::Duration;

use serde_json::Value;

use crate::error::{GenerationError, TransportError};
use crate::types::ProviderId;

/// Characters of an error body kept in transport error messages.
const BODY_SAMPLE_CHARS: usize = 200;

/// Describes an outgoing request for logging.
#[derive(Clone, Debug)]
pub struct HttpRequestContext {
    pub provider: ProviderId,
    pub url: String,
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenerationError::ConfigurationError(format!("Failed to create HTTP client: {e}")))
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// POST `body` as JSON and return the response text of a 2xx reply.
pub async fn send_json(
    ctx: &HttpRequestContext,
    builder: reqwest::RequestBuilder,
    body: &Value,
) -> Result<String, TransportError> {
    tracing::debug!(target: "mindscape_ai::http", provider = %ctx.provider, url = %ctx.url, "sending request");

    let response = match builder.json(body).send().await {
        Ok(r) => r,
        Err(e) => {
            let error = TransportError::from(e);
            tracing::debug!(target: "mindscape_ai::http", provider = %ctx.provider, url = %ctx.url, err = %error, "request error");
            return Err(error);
        }
    };

    let status = response.status();
    tracing::debug!(target: "mindscape_ai::http", provider = %ctx.provider, url = %ctx.url, status = status.as_u16(), "response received");

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let error = classify_http_error(status.as_u16(), &text);
        tracing::debug!(target: "mindscape_ai::http", provider = %ctx.provider, url = %ctx.url, err = %error, "request error");
        return Err(error);
    }

    Ok(response.text().await?)
}

/// Map a non-2xx reply to a transport error.
///
/// Quota and rate-limit complaints are reported as rate limiting even when
/// the upstream uses 400 or 403 for them. Gemini rejects a bad key with a 400
/// `API_KEY_INVALID`, which is reported as a credential failure.
pub fn classify_http_error(status: u16, body: &str) -> TransportError {
    let message = error_message(body).unwrap_or_else(|| body.chars().take(BODY_SAMPLE_CHARS).collect());
    let message = format!("http={status} {message}");

    if status == 400 || status == 403 {
        let lower = body.to_lowercase();
        let rate_like = lower.contains("quota")
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("resource_exhausted");
        if rate_like {
            return TransportError::RateLimited { status, message };
        }
        if lower.contains("api_key_invalid") || lower.contains("api key not valid") {
            return TransportError::Unauthorized { status, message };
        }
    }
    TransportError::from_status(status, message)
}

/// `error.message` (OpenAI and Google envelopes) or a top-level `message`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))?;
    match message {
        Value::String(s) => Some(s.chars().take(BODY_SAMPLE_CHARS).collect()),
        _ => None,
    }
}
