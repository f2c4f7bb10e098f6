use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProviderId;

/// Number of characters of raw model output kept on an extraction failure.
pub const RAW_PREVIEW_CHARS: usize = 300;

/// Transport-level failure reported by a provider adapter.
///
/// Adapters never decode structured payloads; every error they return is one
/// of these variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("rate limited (status {status}): {message}")]
    RateLimited { status: u16, message: String },
    #[error("credentials rejected (status {status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("upstream server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("request rejected (status {status}): {message}")]
    Client { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("upstream returned empty content")]
    EmptyResponse,
}

impl TransportError {
    /// Classify a non-success HTTP status with its response body.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            408 => Self::Timeout(message),
            429 => Self::RateLimited { status, message },
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }

    /// HTTP status associated with this failure, if any.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status, .. }
            | Self::Unauthorized { status, .. }
            | Self::Server { status, .. }
            | Self::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Error category for coarse-grained handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Network or upstream HTTP failures
    Transport,
    /// Model output could not be turned into the requested shape
    Output,
    /// Credential problems
    Authentication,
    /// Caller mistakes (malformed request, missing adapter)
    Request,
    /// Misconfiguration at construction time
    Configuration,
    /// Every candidate failed
    Exhausted,
}

/// Errors surfaced by the generation layer.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Network/HTTP failure from an adapter.
    #[error("provider {provider} unavailable: {source}")]
    ProviderUnavailable {
        provider: ProviderId,
        #[source]
        source: TransportError,
    },

    /// No plausible JSON value could be located in the model output.
    #[error("no structured payload found ({reason}); output began with: {raw_preview}")]
    ExtractionFailed { reason: String, raw_preview: String },

    /// JSON was found but lacks the required shape.
    #[error("output does not match schema `{schema}`: {}", .violations.join("; "))]
    SchemaValidationFailed {
        schema: String,
        violations: Vec<String>,
    },

    /// A caller-supplied credential was rejected by the provider.
    #[error("credentials rejected by {provider}: {message}")]
    Unauthenticated { provider: ProviderId, message: String },

    /// Every candidate and every retry failed.
    #[error("all candidates exhausted after {attempts} attempt(s); last error: {last}")]
    AllCandidatesExhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl GenerationError {
    /// Build an extraction failure keeping a bounded preview of the raw text.
    pub fn extraction_failed(reason: impl Into<String>, raw: &str) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
            raw_preview: raw.chars().take(RAW_PREVIEW_CHARS).collect(),
        }
    }

    /// Whether the dispatcher may spend another attempt after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderUnavailable { source, .. } => !source.is_auth(),
            Self::ExtractionFailed { .. } | Self::SchemaValidationFailed { .. } => true,
            Self::Unauthenticated { .. }
            | Self::AllCandidatesExhausted { .. }
            | Self::InvalidRequest(_)
            | Self::ConfigurationError(_) => false,
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderUnavailable { .. } => ErrorCategory::Transport,
            Self::ExtractionFailed { .. } | Self::SchemaValidationFailed { .. } => {
                ErrorCategory::Output
            }
            Self::Unauthenticated { .. } => ErrorCategory::Authentication,
            Self::AllCandidatesExhausted { .. } => ErrorCategory::Exhausted,
            Self::InvalidRequest(_) => ErrorCategory::Request,
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
        }
    }

    /// The innermost error behind an `AllCandidatesExhausted`, or `self`.
    pub fn root_cause(&self) -> &GenerationError {
        match self {
            Self::AllCandidatesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            TransportError::from_status(401, "bad key"),
            TransportError::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            TransportError::from_status(429, "slow down"),
            TransportError::RateLimited { .. }
        ));
        assert!(matches!(
            TransportError::from_status(503, "unavailable"),
            TransportError::Server { status: 503, .. }
        ));
        assert!(matches!(
            TransportError::from_status(408, "late"),
            TransportError::Timeout(_)
        ));
        assert!(matches!(
            TransportError::from_status(404, "missing"),
            TransportError::Client { status: 404, .. }
        ));
    }

    #[test]
    fn extraction_preview_is_bounded() {
        let raw = "x".repeat(1000);
        match GenerationError::extraction_failed("nothing", &raw) {
            GenerationError::ExtractionFailed { raw_preview, .. } => {
                assert_eq!(raw_preview.chars().count(), RAW_PREVIEW_CHARS)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn retryability() {
        let transient = GenerationError::ProviderUnavailable {
            provider: ProviderId::Hosted,
            source: TransportError::from_status(502, "bad gateway"),
        };
        assert!(transient.is_retryable());

        let auth = GenerationError::ProviderUnavailable {
            provider: ProviderId::Hosted,
            source: TransportError::from_status(403, "forbidden"),
        };
        assert!(!auth.is_retryable());

        assert!(GenerationError::extraction_failed("x", "y").is_retryable());
        assert!(!GenerationError::InvalidRequest("empty".into()).is_retryable());
    }

    #[test]
    fn root_cause_unwraps_exhaustion() {
        let err = GenerationError::AllCandidatesExhausted {
            attempts: 4,
            last: Box::new(GenerationError::extraction_failed("no json", "hello")),
        };
        assert_eq!(err.category(), ErrorCategory::Exhausted);
        assert_eq!(err.root_cause().category(), ErrorCategory::Output);
    }
}
