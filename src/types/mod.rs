//! Core data model shared by the dispatcher, the health monitor and the adapters.

mod attempt;
mod provider;
mod request;

pub use attempt::{AttemptOutcome, RetryAttempt};
pub use provider::ProviderId;
pub use request::{GenerationRequest, InlineImage};
