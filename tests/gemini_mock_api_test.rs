//! Mock API tests for the Gemini adapter
//!
//! Response bodies follow the public generateContent reference:
//! https://ai.google.dev/api/generate-content

#![cfg(feature = "gemini")]

use mindscape_ai::prelude::*;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generate_content_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP",
            "safetyRatings": []
        }],
        "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 10, "totalTokenCount": 15},
        "modelVersion": "gemini-1.5-flash"
    })
}

fn adapter(server: &MockServer, key: Option<&str>) -> GeminiAdapter {
    let mut config = GeminiConfig::default().with_base_url(server.uri());
    if let Some(key) = key {
        config = config.with_api_key(key);
    }
    GeminiAdapter::new(config).unwrap()
}

fn canonical(json_mode: bool) -> CanonicalRequest {
    CanonicalRequest {
        system_prompt: "You build mind maps.".to_string(),
        user_prompt: "Topic: cats".to_string(),
        json_mode,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_generate_content_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "server-key"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "You build mind maps."}]},
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_content_response("{\"topic\":\"Cats\"}")))
        .expect(1)
        .mount(&server)
        .await;

    let text = adapter(&server, Some("server-key"))
        .invoke(&canonical(true))
        .await
        .unwrap();
    assert_eq!(text, "{\"topic\":\"Cats\"}");
}

#[tokio::test]
async fn test_caller_key_takes_precedence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-goog-api-key", "caller-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_content_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let request = CanonicalRequest {
        api_key: Some(SecretString::from("caller-key".to_string())),
        ..canonical(false)
    };
    let text = adapter(&server, Some("server-key")).invoke(&request).await.unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_model_override_changes_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_content_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let request = CanonicalRequest {
        model: Some("gemini-2.0-flash".to_string()),
        ..canonical(false)
    };
    adapter(&server, Some("k")).invoke(&request).await.unwrap();
}

#[tokio::test]
async fn test_missing_key_fails_without_calling_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = adapter(&server, None).invoke(&canonical(false)).await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_invalid_key_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-goog-api-key", "revoked"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "API key not valid. Please pass a valid API key.", "status": "UNAUTHENTICATED"}
        })))
        .mount(&server)
        .await;

    let err = adapter(&server, Some("revoked"))
        .invoke(&canonical(false))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Unauthorized { status: 401, .. }));
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn test_quota_errors_are_rate_limits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Quota exceeded for quota metric 'Generate Content'", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let err = adapter(&server, Some("k")).invoke(&canonical(false)).await.unwrap_err();
    assert!(matches!(err, TransportError::RateLimited { status: 403, .. }));
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded."))
        .mount(&server)
        .await;

    let err = adapter(&server, Some("k")).invoke(&canonical(false)).await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_thought_parts_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "weighing the sub-topics", "thought": true},
                    {"text": "{\"topic\":\"Cats\"}"}
                ], "role": "model"}
            }]
        })))
        .mount(&server)
        .await;

    let text = adapter(&server, Some("k")).invoke(&canonical(false)).await.unwrap();
    assert_eq!(text, "{\"topic\":\"Cats\"}");
}

#[tokio::test]
async fn test_blocked_prompt_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let err = adapter(&server, Some("k")).invoke(&canonical(false)).await.unwrap_err();
    assert_eq!(err, TransportError::EmptyResponse);
}

#[tokio::test]
async fn test_inline_images_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [
                {"text": "Topic: cats"},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_content_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let request = CanonicalRequest {
        images: vec![InlineImage::new("image/png", "iVBORw0KGgo=")],
        ..canonical(false)
    };
    adapter(&server, Some("k")).invoke(&request).await.unwrap();
}
