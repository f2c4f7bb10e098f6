//! Utility modules shared by the provider adapters.

pub mod http;

pub use http::{HttpRequestContext, build_http_client, classify_http_error, join_url, send_json};
