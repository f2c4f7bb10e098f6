//! # MindScape AI - Resilient Structured Generation
//!
//! The generation layer behind MindScape's mind maps, quizzes, comparisons and
//! chat answers. Feature code hands a [`GenerationRequest`] to a
//! [`Dispatcher`] and gets back a validated JSON value (or a typed struct),
//! no matter which upstream model produced it or how it was wrapped.
//!
#![deny(unsafe_code)]

//! ## Pieces
//!
//! - **Dispatcher**: plans an ordered candidate list, retries each candidate a
//!   fixed number of times with a fixed backoff, falls back to the next one.
//! - **Health monitor**: per-provider success/failure tally that demotes a
//!   failing hosted provider behind the backup for a cooldown.
//! - **Extractor**: recovers JSON from fenced, prose-wrapped, double-encoded,
//!   envelope-wrapped or truncated model output.
//! - **Adapters**: Gemini `generateContent` and OpenAI-compatible chat
//!   completions (the free backup), behind the [`ProviderAdapter`] trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mindscape_ai::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_tracing(&TracingConfig::default())?;
//!
//!     let dispatcher = ResilienceConfig::from_env()?.build_dispatcher()?;
//!     let request = GenerationRequest::new(
//!         "You build mind maps.",
//!         "Topic: photosynthesis",
//!     )
//!     .with_schema(catalog::mind_map());
//!
//!     let map = dispatcher.generate_content(&request).await?;
//!     println!("{map:#}");
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod health;
pub mod observability;
pub mod providers;
pub mod schema;
pub mod types;
pub mod utils;

pub use adapter::{CanonicalRequest, ProviderAdapter};
pub use config::ResilienceConfig;
pub use dispatch::{DispatchPolicy, Dispatcher, DispatcherBuilder};
pub use error::{ErrorCategory, GenerationError, TransportError};
pub use extract::{Extractor, extract};
pub use health::{HealthMonitor, HealthPolicy, ProviderStatus};
pub use schema::{FieldKind, SchemaDescriptor};
pub use types::{AttemptOutcome, GenerationRequest, InlineImage, ProviderId, RetryAttempt};

/// Common imports for feature code.
pub mod prelude {
    pub use crate::adapter::{CanonicalRequest, ProviderAdapter};
    pub use crate::config::ResilienceConfig;
    pub use crate::dispatch::{DispatchPolicy, Dispatcher, DispatcherBuilder};
    pub use crate::error::{ErrorCategory, GenerationError, TransportError};
    pub use crate::extract::{Extractor, extract};
    pub use crate::health::{HealthMonitor, HealthPolicy, ProviderReport, ProviderStatus};
    pub use crate::observability::{TracingConfig, init_tracing};
    pub use crate::schema::{FieldKind, SchemaDescriptor, catalog};
    pub use crate::types::{GenerationRequest, InlineImage, ProviderId};

    #[cfg(feature = "gemini")]
    pub use crate::providers::{GeminiAdapter, GeminiConfig};
    #[cfg(feature = "openai-compatible")]
    pub use crate::providers::{OpenAiCompatibleAdapter, OpenAiCompatibleConfig};
}
