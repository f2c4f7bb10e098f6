use std::fmt;
use std::time::Duration;

use super::ProviderId;
use crate::error::GenerationError;

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Output arrived but no valid structured value could be recovered
    DecodeFailure(String),
    /// Network or HTTP failure
    TransportFailure(String),
    /// Credentials rejected
    Rejected(String),
}

impl AttemptOutcome {
    pub fn from_error(error: &GenerationError) -> Self {
        match error {
            GenerationError::ExtractionFailed { .. }
            | GenerationError::SchemaValidationFailed { .. } => {
                Self::DecodeFailure(error.to_string())
            }
            GenerationError::ProviderUnavailable { source, .. } if source.is_auth() => {
                Self::Rejected(error.to_string())
            }
            GenerationError::Unauthenticated { .. } => Self::Rejected(error.to_string()),
            _ => Self::TransportFailure(error.to_string()),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Bookkeeping for one pass through the retry loop. Never persisted.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// Zero-based index across the whole call
    pub index: u32,
    pub provider: ProviderId,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for RetryAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match &self.outcome {
            AttemptOutcome::Success => "success",
            AttemptOutcome::DecodeFailure(_) => "decode failure",
            AttemptOutcome::TransportFailure(_) => "transport failure",
            AttemptOutcome::Rejected(_) => "rejected",
        };
        write!(
            f,
            "attempt #{} via {} ({}ms): {}",
            self.index + 1,
            self.provider,
            self.elapsed.as_millis(),
            outcome
        )
    }
}
