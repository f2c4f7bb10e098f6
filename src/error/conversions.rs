//! Conversions from library errors into the transport taxonomy.

use super::types::TransportError;

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::Connection(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(format!("failed to decode provider envelope: {err}"))
    }
}
